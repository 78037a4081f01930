use crate::api::Backend;
use crate::columns::{build_columns, ColumnDescriptor};
use crate::error::Result;
use crate::filter::{visible_rows, GridFilters};
use crate::models::{Account, Category, RowId, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// User-visible outcome of an operation; the CLI renders these with colors,
/// the sheet view puts them on the status line.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice { severity: Severity::Success, message: message.into() }
    }
    pub fn info(message: impl Into<String>) -> Self {
        Notice { severity: Severity::Info, message: message.into() }
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Notice { severity: Severity::Warning, message: message.into() }
    }
    pub fn error(message: impl Into<String>) -> Self {
        Notice { severity: Severity::Error, message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    AddRow,
    DeleteRow(RowId),
    SaveAll,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GridState {
    Idle,
    AwaitingConfirm(PendingAction),
}

/// The row store plus everything that mutates it. Every destructive or
/// persisting action goes through request -> confirm; cancel returns to idle
/// without side effects.
pub struct Grid {
    pub rows: Vec<Transaction>,
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub columns: Vec<ColumnDescriptor>,
    /// Rows as last seen from the backend, for inline-update diffing.
    baseline: Vec<Transaction>,
    state: GridState,
}

impl Grid {
    /// Fetch reference lists and the full row list from the backend.
    pub fn load(backend: &dyn Backend) -> Result<Self> {
        let accounts = backend.list_accounts()?;
        let categories = backend.list_categories()?;
        let rows = backend.list_transactions()?;
        let columns = build_columns(&accounts, &categories);
        let baseline = rows.clone();
        Ok(Grid {
            rows,
            accounts,
            categories,
            columns,
            baseline,
            state: GridState::Idle,
        })
    }

    pub fn state(&self) -> &GridState {
        &self.state
    }

    pub fn visible(&self, filters: &GridFilters) -> Vec<usize> {
        visible_rows(&self.rows, filters, &self.columns)
    }

    /// Wholesale replacement of the row store with the backend's current
    /// state. Local drafts and unsaved edits are discarded by design; bulk
    /// save calls this to pick up server-assigned ids.
    pub fn refresh(&mut self, backend: &dyn Backend) -> Result<()> {
        self.rows = backend.list_transactions()?;
        self.baseline = self.rows.clone();
        Ok(())
    }

    /// Enter AWAITING_CONFIRM for an action. Add is refused while either
    /// reference list is empty: a transaction needs an account and a category
    /// to default into.
    pub fn request(&mut self, action: PendingAction) -> std::result::Result<String, Notice> {
        if let PendingAction::AddRow = action {
            if self.accounts.is_empty() {
                return Err(Notice::warning(
                    "Você precisa ter pelo menos uma conta cadastrada para adicionar transações.",
                ));
            }
            if self.categories.is_empty() {
                return Err(Notice::warning(
                    "Você precisa ter pelo menos uma categoria cadastrada para adicionar transações.",
                ));
            }
        }
        let message = match &action {
            PendingAction::AddRow => "Tem certeza que deseja adicionar uma nova transação?",
            PendingAction::DeleteRow(_) => {
                "Tem certeza que deseja excluir esta transação? Esta ação não pode ser desfeita."
            }
            PendingAction::SaveAll => {
                "Tem certeza que deseja salvar as alterações nas transações?"
            }
        };
        self.state = GridState::AwaitingConfirm(action);
        Ok(message.to_string())
    }

    pub fn cancel(&mut self) {
        self.state = GridState::Idle;
    }

    /// Execute the pending action. Always ends back in Idle; failures are
    /// reported as notices, never panics.
    pub fn confirm(&mut self, backend: &mut dyn Backend) -> Vec<Notice> {
        let GridState::AwaitingConfirm(action) =
            std::mem::replace(&mut self.state, GridState::Idle)
        else {
            return vec![Notice::warning("Nenhuma ação pendente para confirmar.")];
        };
        match action {
            PendingAction::AddRow => self.execute_add(),
            PendingAction::DeleteRow(id) => self.execute_delete(backend, id),
            PendingAction::SaveAll => self.execute_save_all(backend),
        }
    }

    fn execute_add(&mut self) -> Vec<Notice> {
        // Guarded at request time; lists cannot be empty here.
        let account = self.accounts[0].id;
        let category = self.categories[0].id;
        self.rows.push(Transaction::draft(account, category));
        vec![Notice::info(
            "Nova transação adicionada à planilha. Lembre-se de salvar!",
        )]
    }

    fn execute_delete(&mut self, backend: &mut dyn Backend, id: RowId) -> Vec<Notice> {
        if let Some(persisted) = id.persisted() {
            if let Err(e) = backend.delete_transaction(persisted) {
                // A failed backend delete keeps the row.
                return vec![Notice::error(format!("Erro ao excluir transação: {e}"))];
            }
            self.rows.retain(|r| r.id != id);
            vec![Notice::success("Transação excluída com sucesso!")]
        } else {
            // Draft rows were never persisted; no backend call.
            self.rows.retain(|r| r.id != id);
            vec![Notice::info("Nova transação removida da planilha.")]
        }
    }

    fn execute_save_all(&mut self, backend: &mut dyn Backend) -> Vec<Notice> {
        let modified: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_modified)
            .map(|(i, _)| i)
            .collect();
        if modified.is_empty() {
            return vec![Notice::info("Nenhuma alteração para salvar.")];
        }

        let mut notices = Vec::new();
        let mut saved = 0usize;
        let mut failed = 0usize;

        // Strictly in list order, one row at a time, each row isolated so a
        // bad reference or backend failure never blocks the rest.
        for idx in modified {
            let row = &self.rows[idx];
            if let Err(notice) = self.validate_references(row) {
                notices.push(notice);
                failed += 1;
                continue;
            }
            let payload = row.payload();
            let result = if row.is_new {
                backend.create_transaction(&payload).map(|_| ())
            } else {
                // Only persisted rows can be non-new.
                let id = row.id.persisted().expect("non-draft row has integer id");
                backend.update_transaction(id, &payload)
            };
            match result {
                Ok(()) => saved += 1,
                Err(e) => {
                    notices.push(Notice::error(format!(
                        "Erro ao salvar transação \"{}\": {e}",
                        row.descricao
                    )));
                    failed += 1;
                }
            }
        }

        if saved > 0 {
            notices.push(Notice::success(format!(
                "{saved} transação(ões) salva(s) com sucesso!"
            )));
        }
        if failed > 0 {
            notices.push(Notice::error(format!(
                "{failed} transação(ões) falhou(ram) ao salvar."
            )));
        }

        // Resynchronize with the backend regardless of partial failure, so
        // server-assigned ids replace draft ids.
        if let Err(e) = self.refresh(backend) {
            notices.push(Notice::error(format!("Erro ao recarregar transações: {e}")));
        }
        notices
    }

    fn validate_references(&self, row: &Transaction) -> std::result::Result<(), Notice> {
        let account_ok = row
            .conta_id
            .map(|id| self.accounts.iter().any(|a| a.id == id))
            .unwrap_or(false);
        let category_ok = row
            .categoria_id
            .map(|id| self.categories.iter().any(|c| c.id == id))
            .unwrap_or(false);
        if account_ok && category_ok {
            Ok(())
        } else {
            Err(Notice::error(format!(
                "Erro: Transação \"{}\" não pode ser salva. Conta ou Categoria não selecionada.",
                row.descricao
            )))
        }
    }

    /// Save a single row outside the bulk flow. Sends only the fields that
    /// differ from the last-loaded snapshot; an identical row is a no-op with
    /// no backend call.
    pub fn save_row_inline(&mut self, idx: usize, backend: &mut dyn Backend) -> Notice {
        let Some(row) = self.rows.get(idx) else {
            return Notice::error("Linha inexistente.");
        };
        if let Err(notice) = self.validate_references(row) {
            return notice;
        }

        if row.is_new {
            let payload = row.payload();
            return match backend.create_transaction(&payload) {
                Ok(saved) => {
                    self.baseline.push(saved.clone());
                    self.rows[idx] = saved;
                    Notice::success("Transação salva com sucesso!")
                }
                Err(e) => Notice::error(format!("Erro ao salvar transação: {e}")),
            };
        }

        let id = row.id.persisted().expect("non-draft row has integer id");
        let baseline = self.baseline.iter().find(|b| b.id == row.id);
        let changed = match baseline {
            Some(before) => diff_fields(before, row),
            None => serde_json::Map::new(),
        };
        if changed.is_empty() {
            return Notice::info("Nenhuma alteração para salvar.");
        }
        match backend.update_fields(id, &changed) {
            Ok(()) => {
                let clean = {
                    let row = &mut self.rows[idx];
                    row.is_modified = false;
                    row.clone()
                };
                if let Some(b) = self.baseline.iter_mut().find(|b| b.id == clean.id) {
                    *b = clean;
                }
                Notice::success("Transação atualizada com sucesso!")
            }
            Err(e) => Notice::error(format!("Erro ao atualizar transação: {e}")),
        }
    }
}

/// Field-by-field diff of two rows' wire payloads.
fn diff_fields(
    before: &Transaction,
    after: &Transaction,
) -> serde_json::Map<String, serde_json::Value> {
    let (Ok(before), Ok(after)) = (
        serde_json::to_value(before.payload()),
        serde_json::to_value(after.payload()),
    ) else {
        return serde_json::Map::new();
    };
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return serde_json::Map::new();
    };
    after
        .iter()
        .filter(|(k, v)| before.get(*k) != Some(v))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
