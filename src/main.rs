use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atm_ledger::config::Config;
use atm_ledger::console::Console;
use atm_ledger::AtmEngine;
use atm_ledger::FileAccountStore;

#[derive(Parser)]
#[command(name = "atm-ledger")]
#[command(about = "Terminal ATM simulator over a fixed-record account ledger", long_about = None)]
struct Cli {
    /// JSON config file; unset fields keep their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the account store and both audit logs
    #[arg(short, long)]
    data_dir: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    if let Some(dir) = cli.data_dir {
        config = config.in_dir(dir);
    }

    let store = FileAccountStore::new(&config.store_path);
    let mut engine = match AtmEngine::new(store, &config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let stdin = io::stdin();
    let result = Console::new(&mut engine, stdin.lock(), io::stdout()).run();
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
