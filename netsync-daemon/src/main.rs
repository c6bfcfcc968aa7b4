mod cli;

use anyhow::Result;
use clap::Parser;

use netsync_core::config::NetsyncConfig;
use netsync_core::error::{ConfigError, NetsyncError};
use netsync_daemon::daemon::Daemon;
use netsync_daemon::logging::init_tracing;

use cli::DaemonCli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    // 설정 로드: 파일 -> 환경변수 -> CLI 인자 순으로 덮어씀
    let (mut config, from_defaults) = load_config(&cli).await?;
    if let Some(level) = cli.log_level.clone() {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format.clone() {
        config.general.log_format = format;
    }
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {}", e))?;

    if cli.validate {
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    init_tracing(&config.general)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "netsync-daemon starting");
    if from_defaults {
        tracing::warn!(
            path = %cli.config.display(),
            "config file not found, using defaults and environment overrides"
        );
    }

    let daemon = Daemon::build_from_config(config).await?;
    daemon.run().await
}

/// Load the config file with env overrides applied.
///
/// Returns `true` alongside the config when the default file was absent
/// and built-in defaults were used instead.
async fn load_config(cli: &DaemonCli) -> Result<(NetsyncConfig, bool)> {
    match NetsyncConfig::from_file(&cli.config).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            Ok((config, false))
        }
        Err(NetsyncError::Config(ConfigError::FileNotFound { .. })) if cli.uses_default_config() => {
            let mut config = NetsyncConfig::default();
            config.apply_env_overrides();
            Ok((config, true))
        }
        Err(e) => Err(anyhow::anyhow!("failed to load config: {}", e)),
    }
}
