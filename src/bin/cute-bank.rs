use std::{fs::File, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cute_bank::{
    Bank,
    bin_utils::{ScriptError, Service, demo::run_demo},
    store::{StoreConfig, sqlite::SqliteLedgerStore},
};
use tracing_subscriber::EnvFilter;

/// A small bank ledger backed by SQLite.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// SQLite database file. An in-memory database is used when omitted.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// How long to wait for another writer before failing, in milliseconds.
    #[arg(long, default_value_t = 5000, global = true)]
    busy_timeout_ms: u64,

    /// How many times a conflicting transaction is retried.
    #[arg(long, default_value_t = 3, global = true)]
    max_retries: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a CSV script of ledger operations and print the accounts.
    Run { file: PathBuf },
    /// Run the built-in example scenario.
    Demo,
}

fn main() -> Result<()> {
    setup_logging();
    let args = Args::parse();

    let config = StoreConfig {
        busy_timeout: Duration::from_millis(args.busy_timeout_ms),
        max_retries: args.max_retries,
    };
    let store = match &args.db {
        Some(path) => SqliteLedgerStore::open(path, config)
            .with_context(|| format!("Failed to open database `{}`", path.display()))?,
        None => SqliteLedgerStore::open_in_memory(config)
            .context("Failed to open in-memory database")?,
    };
    let bank = Bank::new(store);

    match args.command {
        Command::Run { file } => {
            let input = File::open(&file)
                .with_context(|| format!("Failed to open `{}`", file.display()))?;
            let service = Service {
                input,
                output: &mut std::io::stdout(),
                bank: &bank,
                error_printer: Box::new(|line: u64, err: ScriptError| match err {
                    ScriptError::Csv(_) | ScriptError::Command(_) => {
                        tracing::error!("Error at line {line}: {err}")
                    }
                    // rejected by the ledger rules, the script itself is fine
                    ScriptError::Ledger(_) => tracing::warn!("Line {line} rejected: {err}"),
                }),
            };
            service.run()
        }
        Command::Demo => run_demo(&bank, &mut std::io::stdout()),
    }
}

fn setup_logging() {
    // stdout carries the CSV output, logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
