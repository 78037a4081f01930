use comfy_table::{Cell, Table};

use crate::api::Backend;
use crate::cli::open_backend;
use crate::error::Result;

pub fn add(nome: &str, tipo: &str) -> Result<()> {
    let mut backend = open_backend()?;
    let account = backend.add_account(nome, tipo)?;
    println!("Conta adicionada: {} (id {})", account.nome, account.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let backend = open_backend()?;
    let accounts = backend.list_accounts()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Nome", "Tipo"]);
    for account in accounts {
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.nome),
            Cell::new(account.tipo),
        ]);
    }
    println!("Contas\n{table}");
    Ok(())
}
