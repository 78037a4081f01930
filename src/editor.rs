use crate::columns::{ColumnDescriptor, ColumnType};
use crate::error::{PlanilhaError, Result};
use crate::models::{Transaction, TransactionType};

/// Raw input arriving from the cell widget: typed text, or a checkbox state
/// for boolean columns.
#[derive(Debug, Clone, PartialEq)]
pub enum CellInput {
    Text(String),
    Toggle(bool),
}

/// What to do with a monetary value that fails to parse. The grid defaults to
/// coercing to zero so the stored state is always valid; `Reject` refuses the
/// commit and leaves the cell untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    #[default]
    CoerceToZero,
    Reject,
}

/// Single-cursor edit state: at most one (row, column) pair is editable at a
/// time.
#[derive(Debug, Default)]
pub struct CellEditor {
    editing: Option<(usize, String)>,
    pub policy: CoercionPolicy,
}

impl CellEditor {
    pub fn begin_edit(&mut self, row: usize, column_id: &str) {
        self.editing = Some((row, column_id.to_string()));
    }

    pub fn end_edit(&mut self) {
        self.editing = None;
    }

    pub fn editing(&self) -> Option<(usize, &str)> {
        self.editing.as_ref().map(|(r, c)| (*r, c.as_str()))
    }

    /// Coerce `input` according to the column's declared type and store it
    /// into the row, marking the row modified. Only the `Reject` policy can
    /// fail, and only for monetary columns.
    pub fn commit(
        &self,
        rows: &mut [Transaction],
        row_idx: usize,
        col: &ColumnDescriptor,
        input: CellInput,
    ) -> Result<()> {
        let row = rows
            .get_mut(row_idx)
            .ok_or_else(|| PlanilhaError::Other(format!("no row at index {row_idx}")))?;

        match (col.id, &input) {
            ("valor", CellInput::Text(raw)) => {
                row.valor = self.coerce_money(raw)?;
            }
            ("parcelado", CellInput::Toggle(checked)) => {
                row.parcelado = *checked;
            }
            ("tipo", CellInput::Text(raw)) => {
                // Select widgets only emit valid option values; keep the
                // current value on anything else.
                if let Some(t) = TransactionType::parse(raw) {
                    row.tipo = t;
                }
            }
            ("conta_id", CellInput::Text(raw)) => {
                row.conta_id = coerce_ref(col, raw);
            }
            ("categoria_id", CellInput::Text(raw)) => {
                row.categoria_id = coerce_ref(col, raw);
            }
            ("numero_parcela", CellInput::Text(raw)) => {
                row.numero_parcela = Some(int_or_zero(raw));
            }
            ("total_parcelas", CellInput::Text(raw)) => {
                row.total_parcelas = Some(int_or_zero(raw));
            }
            ("id_transacao_pai", CellInput::Text(raw)) => {
                row.id_transacao_pai = Some(int_or_zero(raw));
            }
            (_, CellInput::Text(raw)) => match col.kind {
                ColumnType::Date => {
                    let trimmed = raw.trim();
                    let value = (!trimmed.is_empty()).then(|| trimmed.to_string());
                    match col.id {
                        "data" => row.data = value,
                        "data_vencimento" => row.data_vencimento = value,
                        "data_pagamento_recebimento" => {
                            row.data_pagamento_recebimento = value
                        }
                        _ => {}
                    }
                }
                _ => match col.id {
                    "descricao" => row.descricao = raw.clone(),
                    "observacoes" => row.observacoes = raw.clone(),
                    "entidade" => row.entidade = raw.clone(),
                    "status" => row.status = raw.clone(),
                    _ => {}
                },
            },
            // A toggle on a non-boolean column is a widget bug; ignore it.
            (_, CellInput::Toggle(_)) => return Ok(()),
        }

        row.is_modified = true;
        Ok(())
    }

    /// Comma-or-dot decimal input, normalized to a dot-decimal string.
    fn coerce_money(&self, raw: &str) -> Result<String> {
        let cleaned = raw.trim().replace(',', ".");
        match cleaned.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(cleaned),
            _ => match self.policy {
                CoercionPolicy::CoerceToZero => Ok("0.00".to_string()),
                CoercionPolicy::Reject => Err(PlanilhaError::Other(format!(
                    "valor inválido: {raw}"
                ))),
            },
        }
    }
}

fn int_or_zero(raw: &str) -> i64 {
    raw.trim().parse().unwrap_or(0)
}

/// Identifier selects never hold an unresolvable reference: unparseable input
/// falls back to the first available option, or None when there is none.
fn coerce_ref(col: &ColumnDescriptor, raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => col.options.first().and_then(|o| o.value.parse().ok()),
    }
}
