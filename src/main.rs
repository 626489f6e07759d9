//! raidsheet - Generate raid assignment listings from a Google Sheets spreadsheet
//!
//! Reads a TOML configuration naming the spreadsheet and raid, downloads the
//! sheet (or reuses a fresh cached copy), and writes the assignments as text.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use raidsheet::cli::{Cli, RunOptions};
use raidsheet::pipeline::{self, RunError, RunOutcome};

fn init_tracing(verbose: bool) {
    // RUST_LOG wins over --verbose when set
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

async fn run(cli: &Cli) -> Result<RunOutcome, RunError> {
    let options = RunOptions::from_cli(cli)?;
    pipeline::run(&options).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(RunOutcome::Saved(path)) => {
            println!("Assignments saved to {}", path.display());
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Printed(report)) => {
            print!("{report}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            if e.is_retryable() {
                eprintln!("This may be temporary; try again in a moment.");
            }
            ExitCode::FAILURE
        }
    }
}
