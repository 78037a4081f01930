use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{get_data_dir, save_settings, shellexpand_path, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let dir = match data_dir {
        Some(p) => PathBuf::from(shellexpand_path(&p)),
        None => get_data_dir(),
    };
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("planilha.db");
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;

    // When PLANILHA_DATA_DIR is set it already wins over settings.json;
    // don't overwrite the user's configured directory from a scripted run.
    if std::env::var("PLANILHA_DATA_DIR").is_err() {
        save_settings(&Settings {
            data_dir: dir.to_string_lossy().to_string(),
        })?;
    }

    println!("Banco de dados inicializado em {}", db_path.display());
    println!();
    println!("Próximos passos:");
    println!("  planilha accounts add \"Conta Corrente\"");
    println!("  planilha categories list");
    println!("  planilha sheet");
    println!("  planilha demo   (dados de exemplo)");
    Ok(())
}
