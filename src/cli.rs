// src/cli.rs

use crate::logging::LogFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "logdrop - drop off diagnostic log dumps and pick them up by key",
    long_about = "logdrop takes a raw diagnostic log dump (or a pre-split JSON upload), splits it into its main, dmesg and app-log sections and stores it under a random key. Anyone holding the key can fetch or remove the bundle; bundles expire two days after upload."
)]
pub struct Cli {
    /// Path to the bundle database. Defaults to ~/.config/logdrop/logdrop.db
    #[arg(long, global = true, env = "LOGDROP_DB", value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[arg(long, global = true, default_value = "warn", help = "Log level (RUST_LOG overrides it)")]
    pub log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Creates the bundle database and its expiry policy.
    Init,

    /// Stores a log dump and prints the key it was stored under.
    /// Reads from FILE, or from stdin when no file is given.
    Submit {
        /// File holding the upload.
        file: Option<PathBuf>,

        #[arg(long, help = "Treat the input as a JSON payload instead of raw text")]
        json: bool,
    },

    /// Prints the bundle stored under a key.
    Fetch {
        key: Option<String>,

        #[arg(short, long, value_enum, help = "Print only this section, as plain text")]
        section: Option<Section>,
    },

    /// Removes the bundle stored under a key. Succeeds even if there is none.
    Remove { key: Option<String> },

    /// Deletes every bundle past the two day retention window.
    Purge,
}

impl Commands {
    /// Operation name used in logs and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Init => "init",
            Commands::Submit { .. } => "submit",
            Commands::Fetch { .. } => "fetch",
            Commands::Remove { .. } => "remove",
            Commands::Purge => "purge",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Section {
    Main,
    Dmesg,
    Apps,
}
