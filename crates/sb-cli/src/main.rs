//! Schemabuild CLI - dependency-aware database builds from versioned SQL scripts

use anyhow::{Context, Result};
use clap::Parser;
use flexi_logger::{AdaptiveFormat, Logger, LoggerHandle, WriteMode};
use std::process::ExitCode;

mod cli;
mod commands;
mod context;

use cli::Cli;
use commands::{build, db, diff, update};

/// Install the logger; `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(verbose: bool) -> Result<LoggerHandle> {
    let level = if verbose { "debug" } else { "warn" };
    Logger::try_with_env_or_str(level)
        .context("Invalid log specification")?
        .write_mode(WriteMode::Async)
        .adaptive_format_for_stderr(AdaptiveFormat::Default)
        .start()
        .context("Failed to start logger")
}

async fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        cli::Commands::Diff(args) => diff::execute(args, &cli.global).await,
        cli::Commands::Update(args) => update::execute(args, &cli.global).await,
        cli::Commands::Build(args) => build::execute(args, &cli.global).await,
        cli::Commands::Db(args) => db::execute(args, &cli.global).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let logger = match init_logging(cli.global.verbose) {
        Ok(handle) => Some(handle),
        Err(err) => {
            eprintln!("Warning: {:#}", err);
            None
        }
    };

    let result = run(&cli).await;
    if let Some(logger) = &logger {
        logger.flush();
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:?}", err);
            ExitCode::FAILURE
        }
    }
}
