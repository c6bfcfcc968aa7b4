//! Daemon assembly and lifecycle management.
//!
//! The [`Daemon`] loads configuration, installs the metrics recorder,
//! loads the discovery dataset, selects the inventory backend and serves
//! the HTTP API until a shutdown signal arrives.
//!
//! # Startup Order
//!
//! 1. Validate configuration
//! 2. Install metrics recorder (if enabled)
//! 3. Load the discovery dataset (an unreadable dataset falls back to empty)
//! 4. Select the inventory backend (live if url and token are set, else degraded)
//! 5. Bind the listener and serve
//!
//! # Shutdown
//!
//! On SIGTERM/SIGINT the shutdown token is cancelled. In-flight scans stop
//! starting new targets, abort running ones and answer with partial reports;
//! the server then drains open connections and exits.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use axum::Router;
use netsync_core::config::NetsyncConfig;
use netsync_core::metrics as m;
use netsync_reconciler::{
    DiscoverySource, InventoryBackend, ReconcilerConfig, ReconciliationEngine,
};
use tokio_util::sync::CancellationToken;

use crate::api::{self, AppState};
use crate::health::HealthReport;
use crate::metrics_server;

/// Interval between uptime gauge updates.
const UPTIME_INTERVAL: Duration = Duration::from_secs(10);

/// The netsync daemon.
pub struct Daemon {
    config: NetsyncConfig,
    state: Arc<AppState<InventoryBackend>>,
    shutdown: CancellationToken,
}

impl Daemon {
    /// Load configuration from `config_path` and build the daemon.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = NetsyncConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config).await
    }

    /// Build from an already-loaded configuration.
    pub async fn build_from_config(config: NetsyncConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let reconciler = ReconcilerConfig::from_core(&config);
        reconciler
            .validate()
            .map_err(|e| anyhow::anyhow!("reconciler config invalid: {}", e))?;

        let discovery = load_dataset(&reconciler.dataset_path).await;
        let inventory = InventoryBackend::from_config(&reconciler.inventory)
            .map_err(|e| anyhow::anyhow!("failed to build inventory client: {}", e))?;

        let engine = ReconciliationEngine::new(
            Arc::new(inventory),
            Arc::new(discovery),
            reconciler.max_concurrency,
        );
        let shutdown = CancellationToken::new();
        let state = AppState::new(engine, reconciler.max_targets)
            .with_shutdown(shutdown.clone())
            .with_start_time(Instant::now());

        tracing::info!(
            mode = state.engine().mode().as_str(),
            dataset_entries = state.engine().discovery().len(),
            max_concurrency = reconciler.max_concurrency,
            max_targets = reconciler.max_targets,
            "daemon assembled"
        );

        Ok(Self {
            config,
            state: Arc::new(state),
            shutdown,
        })
    }

    /// The HTTP router for this daemon.
    pub fn router(&self) -> Router {
        api::router(Arc::clone(&self.state))
    }

    /// Current health snapshot.
    pub fn health(&self) -> HealthReport {
        self.state.health()
    }

    /// Token cancelled on shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Loaded configuration.
    pub fn config(&self) -> &NetsyncConfig {
        &self.config
    }

    /// Bind the listener and serve until SIGTERM/SIGINT.
    pub async fn run(self) -> Result<()> {
        let addr: SocketAddr = format!(
            "{}:{}",
            self.config.server.listen_addr, self.config.server.port
        )
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid server listen address: {}", e))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", addr, e))?;
        tracing::info!(listen_addr = %addr, "discovery API listening");

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(Instant::now(), self.shutdown.clone()));

        let shutdown = self.shutdown.clone();
        let serve_result = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                match wait_for_shutdown_signal().await {
                    Ok(signal) => tracing::info!(signal, "shutdown signal received"),
                    Err(e) => tracing::error!(error = %e, "signal handling failed, shutting down"),
                }
                shutdown.cancel();
            })
            .await;

        self.shutdown.cancel();
        if let Some(task) = uptime_task
            && let Err(e) = task.await
        {
            tracing::error!(error = %e, "uptime updater task panicked");
        }

        serve_result.map_err(|e| anyhow::anyhow!("server error: {}", e))?;
        tracing::info!("netsync-daemon shut down");
        Ok(())
    }
}

/// Load the discovery dataset, falling back to an empty one on failure.
///
/// Every scan then reports its targets as skipped with "no discovery data",
/// and `/health` reports `degraded`.
pub async fn load_dataset(path: &str) -> DiscoverySource {
    let discovery = match DiscoverySource::load(path).await {
        Ok(source) => source,
        Err(e) => {
            tracing::error!(path, error = %e, "could not load discovery dataset, continuing with an empty one");
            DiscoverySource::empty()
        }
    };
    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::DISCOVERY_DATASET_ENTRIES).set(discovery.len() as f64);
    discovery
}

/// Wait for SIGTERM or SIGINT and return the signal name.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Record the build info gauge once.
fn record_daemon_metrics() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "daemon metrics recorded");
}

/// Periodically update the uptime gauge until shutdown.
fn spawn_uptime_updater(
    start_time: Instant,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(UPTIME_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
