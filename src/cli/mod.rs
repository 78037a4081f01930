pub mod accounts;
pub mod categories;
pub mod demo;
pub mod export;
pub mod import;
pub mod init;
pub mod sheet;
pub mod transactions;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::db::SqliteBackend;
use crate::error::Result;
use crate::grid::{Notice, Severity};
use crate::settings;

#[derive(Parser)]
#[command(
    name = "planilha",
    about = "Planilha de transações financeiras pessoais no terminal."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Escolher o diretório de dados e inicializar o banco.
    Init {
        /// Diretório de dados (padrão: ~/Documents/planilha)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Abrir a planilha interativa de transações.
    Sheet,
    /// Gerenciar contas.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Gerenciar categorias.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Listar transações com filtros.
    Transactions {
        /// Busca por texto em qualquer coluna
        #[arg(long)]
        search: Option<String>,
        /// Filtrar por tipo: income ou expense
        #[arg(long)]
        tipo: Option<String>,
        /// Filtrar por mês (YYYY-MM)
        #[arg(long)]
        month: Option<String>,
    },
    /// Exportar todas as transações para CSV.
    Export {
        /// Arquivo de saída (padrão: transacoes_exportadas_<data>.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Gerar um modelo CSV em branco para preenchimento.
    Template {
        /// Arquivo de saída (padrão: modelo_transacao_<data>.csv)
        #[arg(long)]
        output: Option<String>,
    },
    /// Importar transações de um arquivo CSV.
    Import {
        /// Caminho do arquivo CSV
        file: String,
    },
    /// Carregar dados de exemplo para explorar a planilha.
    Demo,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Adicionar uma conta.
    Add {
        /// Nome da conta
        nome: String,
        /// Tipo da conta (corrente, poupança, dinheiro...)
        #[arg(long, default_value = "corrente")]
        tipo: String,
    },
    /// Listar contas.
    List,
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Adicionar uma categoria.
    Add {
        /// Nome da categoria
        nome: String,
        /// Tipo: income ou expense
        #[arg(long, default_value = "expense")]
        tipo: String,
    },
    /// Listar categorias.
    List,
}

/// Open (and initialize if needed) the database in the configured data dir.
pub(crate) fn open_backend() -> Result<SqliteBackend> {
    let dir = settings::get_data_dir();
    std::fs::create_dir_all(&dir)?;
    SqliteBackend::open(&settings::db_path())
}

pub(crate) fn print_notice(notice: &Notice) {
    match notice.severity {
        Severity::Success => println!("{}", notice.message.green()),
        Severity::Info => println!("{}", notice.message.cyan()),
        Severity::Warning => println!("{}", notice.message.yellow()),
        Severity::Error => eprintln!("{}", notice.message.red()),
    }
}
