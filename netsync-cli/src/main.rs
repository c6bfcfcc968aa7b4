//! netsync CLI entry point
//!
//! Parses arguments, initialises logging to stderr, dispatches to the
//! subcommand handler and maps errors to process exit codes.

mod cli;
mod commands;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.log_level.as_deref());

    if let Err(err) = run(cli).await {
        eprintln!("error: {}", err);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);
    let config_path = cli.config.as_path();

    match cli.command {
        Commands::Discover(args) => commands::discover::execute(args, config_path, &writer).await,
        Commands::Config(args) => commands::config::execute(args, config_path, &writer).await,
        Commands::Dataset(args) => commands::dataset::execute(args, config_path, &writer).await,
        Commands::Status(args) => commands::status::execute(args, config_path, &writer).await,
    }
}

/// Logs go to stderr so stdout stays parseable with `--output json`.
fn init_tracing(log_level: Option<&str>) {
    let filter = log_level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
