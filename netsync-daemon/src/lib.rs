//! netsync daemon library.
//!
//! This library exposes internal modules for integration testing.
//! In production, `netsync-daemon` is used as a binary (main.rs).

pub mod api;
pub mod daemon;
pub mod health;
pub mod logging;
pub mod metrics_server;
