#![doc = include_str!("../README.md")]

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod inventory;
pub mod report;
pub mod resolver;

pub use config::{ReconcilerConfig, ReconcilerConfigBuilder};
pub use discovery::DiscoverySource;
pub use engine::{DeviceLocks, ReconciliationEngine};
pub use error::InventoryError;
pub use inventory::{
    DegradedInventory, InjectedFailure, InventoryBackend, InventoryClient, LiveInventory,
    MemoryInventory,
};
pub use report::ReportAggregator;
pub use resolver::{ResolvedScan, ScanRequest, merge_targets, resolve_cidr};
