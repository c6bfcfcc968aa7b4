//! Daemon health reporting.
//!
//! The health status is derived from the inventory mode and the loaded
//! discovery dataset:
//!
//! - Live mode with a non-empty dataset -> `ok`
//! - Degraded mode, or an empty dataset -> `degraded`
//!
//! Test-only in-memory backends count as `ok`.

use netsync_core::types::InventoryMode;
use serde::Serialize;

/// Overall daemon status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Fully operational.
    Ok,
    /// Serving, but mutations are log-only or no discovery data is loaded.
    Degraded,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Overall status.
    pub status: HealthStatus,
    /// Active inventory mode.
    pub mode: InventoryMode,
    /// Number of records in the discovery dataset.
    pub dataset_entries: usize,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
}

impl HealthReport {
    /// Build a report, deriving the status from mode and dataset size.
    pub fn new(mode: InventoryMode, dataset_entries: usize, uptime_secs: u64) -> Self {
        Self {
            status: aggregate_status(mode, dataset_entries),
            mode,
            dataset_entries,
            uptime_secs,
        }
    }
}

/// Derive the overall status.
pub fn aggregate_status(mode: InventoryMode, dataset_entries: usize) -> HealthStatus {
    match mode {
        InventoryMode::Degraded => HealthStatus::Degraded,
        _ if dataset_entries == 0 => HealthStatus::Degraded,
        InventoryMode::Live | InventoryMode::Memory => HealthStatus::Ok,
    }
}
