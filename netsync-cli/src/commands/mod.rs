//! Command handlers -- one module per subcommand

pub mod config;
pub mod dataset;
pub mod discover;
pub mod status;

use std::path::Path;

use tracing::warn;

use netsync_core::config::NetsyncConfig;
use netsync_core::error::{ConfigError, NetsyncError};

use crate::cli::DEFAULT_CONFIG_PATH;
use crate::error::CliError;

/// Load the effective configuration (file + env overrides), validated.
///
/// A missing file at the default path falls back to built-in defaults;
/// a missing file at an explicit path is an error.
pub async fn load_config(config_path: &Path) -> Result<NetsyncConfig, CliError> {
    match NetsyncConfig::load(config_path).await {
        Ok(config) => Ok(config),
        Err(NetsyncError::Config(ConfigError::FileNotFound { path }))
            if config_path.as_os_str() == DEFAULT_CONFIG_PATH =>
        {
            warn!(path = %path, "config file not found, using defaults");
            NetsyncConfig::from_env().map_err(CliError::from)
        }
        Err(e) => Err(e.into()),
    }
}
