use comfy_table::{Cell, Table};

use crate::cli::open_backend;
use crate::error::{PlanilhaError, Result};
use crate::filter::GridFilters;
use crate::fmt::{display_value, month_label};
use crate::grid::Grid;
use crate::models::TransactionType;

const LISTING_COLUMNS: &[&str] = &[
    "descricao",
    "valor",
    "data",
    "tipo",
    "conta_id",
    "categoria_id",
    "parcelado",
    "status",
];

pub fn list(search: Option<String>, tipo: Option<String>, month: Option<String>) -> Result<()> {
    let backend = open_backend()?;
    let grid = Grid::load(&backend)?;

    let tipo = tipo
        .map(|t| {
            TransactionType::parse(&t).ok_or_else(|| {
                PlanilhaError::Other(format!("tipo inválido: {t} (use income ou expense)"))
            })
        })
        .transpose()?;
    // The filter engine matches localized month labels; accept YYYY-MM here.
    let month = month
        .map(|m| {
            month_label(&format!("{m}-01"))
                .ok_or_else(|| PlanilhaError::Other(format!("mês inválido: {m} (use YYYY-MM)")))
        })
        .transpose()?;

    let filters = GridFilters {
        search: search.unwrap_or_default(),
        tipo,
        month,
        ..Default::default()
    };
    let visible = grid.visible(&filters);

    let columns: Vec<_> = grid
        .columns
        .iter()
        .filter(|c| LISTING_COLUMNS.contains(&c.id))
        .collect();

    let mut table = Table::new();
    let mut header = vec!["ID".to_string()];
    header.extend(columns.iter().map(|c| c.name.to_string()));
    table.set_header(header);
    for &idx in &visible {
        let row = &grid.rows[idx];
        let mut cells = vec![Cell::new(row.id.to_string())];
        cells.extend(columns.iter().map(|c| Cell::new(display_value(row, c))));
        table.add_row(cells);
    }

    println!("Transações\n{table}");
    println!(
        "{} de {} transação(ões)",
        visible.len(),
        grid.rows.len()
    );
    Ok(())
}
