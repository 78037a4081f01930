mod api;
mod cli;
mod columns;
mod csv_bridge;
mod db;
mod editor;
mod error;
mod filter;
mod fmt;
mod grid;
mod models;
mod settings;
mod sheet;
mod tui;

use clap::Parser;

use cli::{AccountsCommands, CategoriesCommands, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Sheet => cli::sheet::run(),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { nome, tipo } => cli::accounts::add(&nome, &tipo),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add { nome, tipo } => cli::categories::add(&nome, &tipo),
            CategoriesCommands::List => cli::categories::list(),
        },
        Commands::Transactions {
            search,
            tipo,
            month,
        } => cli::transactions::list(search, tipo, month),
        Commands::Export { output } => cli::export::run(output),
        Commands::Template { output } => cli::export::template(output),
        Commands::Import { file } => cli::import::run(&file),
        Commands::Demo => cli::demo::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
