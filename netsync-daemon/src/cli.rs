//! CLI argument definitions for netsync-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netsync/netsync.toml";

/// netsync discovery reconciliation daemon.
///
/// Loads the discovery dataset once, selects the inventory backend
/// (live or degraded) and serves the discovery API until SIGTERM/SIGINT.
#[derive(Parser, Debug)]
#[command(name = "netsync-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to netsync.toml configuration file.
    ///
    /// A missing file at the default location falls back to built-in
    /// defaults plus `NETSYNC_*` environment overrides.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}

impl DaemonCli {
    /// Whether `--config` still points at the default location.
    pub fn uses_default_config(&self) -> bool {
        self.config.as_os_str() == DEFAULT_CONFIG_PATH
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = DaemonCli::parse_from(["netsync-daemon"]);
        assert!(cli.uses_default_config());
        assert!(!cli.validate);
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn overrides() {
        let cli = DaemonCli::parse_from([
            "netsync-daemon",
            "-c",
            "/tmp/netsync.toml",
            "--log-level",
            "debug",
            "--log-format",
            "pretty",
            "--validate",
        ]);
        assert!(!cli.uses_default_config());
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.log_format.as_deref(), Some("pretty"));
        assert!(cli.validate);
    }
}
