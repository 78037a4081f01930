use comfy_table::{Cell, Table};

use crate::api::Backend;
use crate::cli::open_backend;
use crate::error::{PlanilhaError, Result};
use crate::models::TransactionType;

pub fn add(nome: &str, tipo: &str) -> Result<()> {
    // Category type shares the transaction type vocabulary.
    let tipo = TransactionType::parse(tipo)
        .ok_or_else(|| PlanilhaError::Other(format!("tipo inválido: {tipo} (use income ou expense)")))?;
    let mut backend = open_backend()?;
    let category = backend.add_category(nome, tipo.as_str())?;
    println!("Categoria adicionada: {} (id {})", category.nome, category.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let backend = open_backend()?;
    let categories = backend.list_categories()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Nome", "Tipo"]);
    for category in categories {
        let label = TransactionType::parse(&category.tipo)
            .map(|t| t.label())
            .unwrap_or(category.tipo.as_str());
        table.add_row(vec![
            Cell::new(category.id),
            Cell::new(&category.nome),
            Cell::new(label),
        ]);
    }
    println!("Categorias\n{table}");
    Ok(())
}
