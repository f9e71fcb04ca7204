// src/main.rs

use clap::Parser;
use logdrop::cli::{Cli, Commands};
use logdrop::commands;
use logdrop::db::{self, BundleStore};
use logdrop::error::Result;
use logdrop::logging;
use logdrop::observer::{observe, TracingObserver};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(&cli.log_level, cli.log_format) {
        eprintln!("Error: failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let operation = cli.command.name();
    if let Err(e) = observe(&TracingObserver, operation, run(cli)) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let db_path = match cli.db {
        Some(path) => path,
        None => db::default_db_path()?,
    };

    // Request input is checked before the database is opened.
    let open = || BundleStore::open(&db_path);
    match cli.command {
        Commands::Init => commands::handle_init(&open()?, &db_path),
        Commands::Submit { file, json } => {
            let payload = commands::read_payload(file.as_deref(), json)?;
            commands::handle_submit(&open()?, payload)
        }
        Commands::Fetch { key, section } => {
            let key = commands::require_key(key.as_deref())?;
            commands::handle_fetch(&open()?, key, section)
        }
        Commands::Remove { key } => {
            let key = commands::require_key(key.as_deref())?;
            commands::handle_remove(&open()?, key)
        }
        Commands::Purge => commands::handle_purge(&open()?),
    }
}
