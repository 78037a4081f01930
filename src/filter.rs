use std::collections::{BTreeSet, HashMap};

use crate::columns::ColumnDescriptor;
use crate::fmt::{display_value, month_label};
use crate::models::{Transaction, TransactionType};

/// The four filter dimensions of the grid. All combine with logical AND.
#[derive(Debug, Clone, Default)]
pub struct GridFilters {
    /// Case-insensitive substring matched against every column's displayed value.
    pub search: String,
    /// None means "Todos".
    pub tipo: Option<TransactionType>,
    /// Localized "month year" label; None means "Todos".
    pub month: Option<String>,
    /// Per-column allow-lists of displayed values. A present-but-empty list
    /// suppresses every row (the "Clear All" state).
    pub columns: HashMap<String, Vec<String>>,
}

/// Compute the visible subset of the row store. Pure: no mutation, input order
/// preserved. Returns indices into `rows` so callers can map the cursor back
/// to the store.
pub fn visible_rows(
    rows: &[Transaction],
    filters: &GridFilters,
    columns: &[ColumnDescriptor],
) -> Vec<usize> {
    let term = filters.search.trim().to_lowercase();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| {
            if !term.is_empty() && !matches_search(row, &term, columns) {
                return false;
            }
            if let Some(tipo) = filters.tipo {
                if row.tipo != tipo {
                    return false;
                }
            }
            if let Some(ref month) = filters.month {
                let label = row.data.as_deref().and_then(month_label);
                if label.as_deref() != Some(month.as_str()) {
                    return false;
                }
            }
            for (col_id, allowed) in &filters.columns {
                let Some(col) = columns.iter().find(|c| c.id == col_id.as_str()) else {
                    continue;
                };
                if !allowed.contains(&display_value(row, col)) {
                    return false;
                }
            }
            true
        })
        .map(|(i, _)| i)
        .collect()
}

fn matches_search(row: &Transaction, term: &str, columns: &[ColumnDescriptor]) -> bool {
    columns
        .iter()
        .any(|col| display_value(row, col).to_lowercase().contains(term))
}

/// Sorted, deduplicated month labels present in the data, for the month
/// filter dropdown.
pub fn unique_months(rows: &[Transaction]) -> Vec<String> {
    let months: BTreeSet<String> = rows
        .iter()
        .filter_map(|r| r.data.as_deref().and_then(month_label))
        .collect();
    months.into_iter().collect()
}

/// Sorted, deduplicated displayed values of one column, for the per-column
/// filter checklist.
pub fn unique_display_values(rows: &[Transaction], col: &ColumnDescriptor) -> Vec<String> {
    let values: BTreeSet<String> = rows.iter().map(|r| display_value(r, col)).collect();
    values.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::columns::build_columns;
    use crate::models::{Account, Category, RowId};

    fn refs() -> (Vec<Account>, Vec<Category>) {
        let accounts = vec![
            Account { id: 1, nome: "Carteira".to_string(), tipo: "corrente".to_string() },
            Account { id: 2, nome: "Poupança".to_string(), tipo: "poupanca".to_string() },
        ];
        let categories = vec![
            Category { id: 10, nome: "Alimentação".to_string(), tipo: "expense".to_string() },
            Category { id: 11, nome: "Salário".to_string(), tipo: "income".to_string() },
        ];
        (accounts, categories)
    }

    fn row(desc: &str, tipo: TransactionType, date: &str, conta: i64, cat: i64) -> Transaction {
        Transaction {
            id: RowId::Persisted(1),
            descricao: desc.to_string(),
            valor: "100.00".to_string(),
            data: Some(date.to_string()),
            tipo,
            conta_id: Some(conta),
            categoria_id: Some(cat),
            observacoes: String::new(),
            data_vencimento: None,
            entidade: String::new(),
            data_pagamento_recebimento: None,
            parcelado: false,
            numero_parcela: None,
            total_parcelas: None,
            id_transacao_pai: None,
            status: String::new(),
            is_new: false,
            is_modified: false,
        }
    }

    fn sample() -> (Vec<Transaction>, Vec<ColumnDescriptor>) {
        let (accounts, categories) = refs();
        let rows = vec![
            row("Mercado", TransactionType::Expense, "2025-01-10", 1, 10),
            row("Pagamento cliente", TransactionType::Income, "2025-01-20", 2, 11),
            row("Padaria", TransactionType::Expense, "2025-02-03", 1, 10),
        ];
        (rows, build_columns(&accounts, &categories))
    }

    #[test]
    fn test_no_filters_returns_all_in_order() {
        let (rows, cols) = sample();
        let visible = visible_rows(&rows, &GridFilters::default(), &cols);
        assert_eq!(visible, vec![0, 1, 2]);
    }

    #[test]
    fn test_search_matches_displayed_values() {
        let (rows, cols) = sample();
        let filters = GridFilters { search: "mercado".to_string(), ..Default::default() };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![0]);

        // Matches the account column's displayed label, not a raw id
        let filters = GridFilters { search: "poupança".to_string(), ..Default::default() };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![1]);

        // Matches the formatted date
        let filters = GridFilters { search: "03/02".to_string(), ..Default::default() };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![2]);
    }

    #[test]
    fn test_type_and_month_filters() {
        let (rows, cols) = sample();
        let filters = GridFilters {
            tipo: Some(TransactionType::Expense),
            ..Default::default()
        };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![0, 2]);

        let filters = GridFilters {
            month: Some("janeiro de 2025".to_string()),
            ..Default::default()
        };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![0, 1]);
    }

    #[test]
    fn test_dimensions_combine_with_and() {
        let (rows, cols) = sample();
        let filters = GridFilters {
            tipo: Some(TransactionType::Expense),
            month: Some("janeiro de 2025".to_string()),
            ..Default::default()
        };
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![0]);
    }

    #[test]
    fn test_per_column_allow_list() {
        let (rows, cols) = sample();
        let mut filters = GridFilters::default();
        filters
            .columns
            .insert("conta_id".to_string(), vec!["Carteira".to_string()]);
        assert_eq!(visible_rows(&rows, &filters, &cols), vec![0, 2]);
    }

    #[test]
    fn test_empty_allow_list_suppresses_all() {
        let (rows, cols) = sample();
        let mut filters = GridFilters::default();
        filters.columns.insert("conta_id".to_string(), Vec::new());
        assert!(visible_rows(&rows, &filters, &cols).is_empty());
    }

    #[test]
    fn test_unique_months_sorted_dedup() {
        let (rows, _) = sample();
        let months = unique_months(&rows);
        assert_eq!(months.len(), 2);
        assert!(months.contains(&"janeiro de 2025".to_string()));
        assert!(months.contains(&"fevereiro de 2025".to_string()));
    }

    #[test]
    fn test_unique_display_values() {
        let (rows, cols) = sample();
        let conta = cols.iter().find(|c| c.id == "conta_id").unwrap();
        let values = unique_display_values(&rows, conta);
        assert_eq!(values, vec!["Carteira".to_string(), "Poupança".to_string()]);
    }

    #[test]
    fn test_filter_does_not_mutate_rows() {
        let (rows, cols) = sample();
        let before = rows.clone();
        let filters = GridFilters { search: "mercado".to_string(), ..Default::default() };
        let _ = visible_rows(&rows, &filters, &cols);
        assert_eq!(rows, before);
    }
}
