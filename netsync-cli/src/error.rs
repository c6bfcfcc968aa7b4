//! CLI-specific error types and exit code mapping

use netsync_core::error::{DatasetError, InputError, NetsyncError};
use netsync_reconciler::InventoryError;

/// CLI-specific error type.
///
/// Each variant carries enough context for a user-friendly message.
/// The `exit_code()` method maps errors to standard Unix exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// Cannot reach the daemon (`status`).
    #[error("daemon not reachable: {0}")]
    DaemonUnavailable(String),

    /// The scan request was rejected before any target was processed.
    #[error("invalid request: {0}")]
    Input(#[from] InputError),

    /// The discovery dataset could not be loaded.
    #[error("dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Reconciliation finished, but some targets failed.
    #[error("reconciliation incomplete: {0}")]
    Reconcile(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from netsync-core.
    #[error("{0}")]
    Core(#[from] NetsyncError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                 |
    /// |------|-----------------------------------------|
    /// | 0    | Success                                 |
    /// | 1    | General / command error                 |
    /// | 2    | Configuration error                     |
    /// | 3    | Daemon unreachable                      |
    /// | 4    | Some targets ended in `errors`          |
    /// | 5    | Invalid scan request                    |
    /// | 6    | Discovery dataset invalid or unreadable |
    /// | 10   | IO error                                |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::DaemonUnavailable(_) => 3,
            Self::Reconcile(_) => 4,
            Self::Input(_) => 5,
            Self::Dataset(_) => 6,
            Self::Io(_) => 10,
            Self::Core(NetsyncError::Config(_)) => 2,
            Self::Core(NetsyncError::Input(_)) => 5,
            Self::Core(NetsyncError::Dataset(_)) => 6,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<InventoryError> for CliError {
    fn from(e: InventoryError) -> Self {
        match e {
            InventoryError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Command(other.to_string()),
        }
    }
}
