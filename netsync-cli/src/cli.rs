//! CLI argument parsing using clap derive API
//!
//! This module defines the command-line interface structure using clap's derive macros.
//! It is purely declarative with no side effects or I/O.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Default configuration file path (relative to the working directory).
pub const DEFAULT_CONFIG_PATH: &str = "netsync.toml";

/// netsync -- discovery to inventory reconciliation.
///
/// Use `netsync <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "netsync", version, about, long_about = None)]
pub struct Cli {
    /// Path to the netsync.toml configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table / text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a one-shot reconciliation and print the report.
    Discover(DiscoverArgs),

    /// Manage configuration.
    Config(ConfigArgs),

    /// Inspect the discovery dataset.
    Dataset(DatasetArgs),

    /// Query a running daemon's health endpoint.
    Status(StatusArgs),
}

// ---- discover ----

/// Reconcile a CIDR range and/or explicit addresses against the inventory.
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// CIDR range to scan (e.g. 192.168.1.0/29).
    #[arg(long)]
    pub cidr: Option<String>,

    /// Explicit address to scan (repeatable).
    #[arg(long = "ip", value_name = "ADDR")]
    pub ips: Vec<String>,

    /// Prefix prepended to discovered hostnames for lookup and creation.
    #[arg(long)]
    pub name_prefix: Option<String>,

    /// Override the discovery dataset path.
    #[arg(long)]
    pub dataset: Option<PathBuf>,

    /// Override the maximum number of targets processed concurrently.
    #[arg(long)]
    pub concurrency: Option<usize>,
}

// ---- config ----

/// Manage netsync configuration.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration file and report errors.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only a specific section (general, server, inventory, discovery, engine, metrics).
        #[arg(long)]
        section: Option<String>,
    },
}

// ---- dataset ----

/// Inspect the discovery dataset.
#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub action: DatasetAction,
}

#[derive(Subcommand, Debug)]
pub enum DatasetAction {
    /// Parse and validate a dataset file without contacting the inventory.
    Check {
        /// Dataset path (default: `[discovery].dataset_path` from the config).
        path: Option<PathBuf>,
    },
}

// ---- status ----

/// Query a running daemon.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Daemon base URL (default: derived from `[server]` in the config).
    #[arg(long)]
    pub url: Option<String>,
}
