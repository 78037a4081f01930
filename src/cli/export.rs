use std::fs::File;
use std::path::PathBuf;

use crate::api::Backend;
use crate::cli::open_backend;
use crate::csv_bridge;
use crate::error::Result;

pub fn run(output: Option<String>) -> Result<()> {
    let backend = open_backend()?;
    let rows = backend.list_transactions()?;
    let accounts = backend.list_accounts()?;
    let categories = backend.list_categories()?;

    let path = PathBuf::from(output.unwrap_or_else(csv_bridge::export_filename));
    let file = File::create(&path)?;
    let count = csv_bridge::export(&rows, &accounts, &categories, file)?;
    println!("{count} transação(ões) exportada(s) para {}", path.display());
    Ok(())
}

pub fn template(output: Option<String>) -> Result<()> {
    let path = PathBuf::from(output.unwrap_or_else(csv_bridge::template_filename));
    let file = File::create(&path)?;
    csv_bridge::template(file)?;
    println!("Modelo gerado em {}", path.display());
    Ok(())
}
