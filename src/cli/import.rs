use std::fs::File;

use crate::api::Backend;
use crate::cli::{open_backend, print_notice};
use crate::csv_bridge;
use crate::error::Result;
use crate::grid::Notice;

pub fn run(file: &str) -> Result<()> {
    let mut backend = open_backend()?;
    let accounts = backend.list_accounts()?;
    let categories = backend.list_categories()?;

    let input = File::open(file)?;
    let report = csv_bridge::import(input, &accounts, &categories, &mut backend)?;

    for error in &report.errors {
        print_notice(&Notice::error(error.clone()));
    }
    if report.imported > 0 {
        print_notice(&Notice::success(format!(
            "{} transação(ões) importada(s) com sucesso!",
            report.imported
        )));
    }
    let skipped = report.resolution_errors + report.backend_errors;
    if skipped > 0 {
        print_notice(&Notice::warning(format!(
            "{skipped} linha(s) ignorada(s) ({} referência(s) não encontrada(s), {} erro(s) ao gravar)",
            report.resolution_errors, report.backend_errors,
        )));
    }
    if report.imported == 0 && report.errors.is_empty() {
        print_notice(&Notice::info("Nenhuma transação encontrada no arquivo."));
    }
    Ok(())
}
