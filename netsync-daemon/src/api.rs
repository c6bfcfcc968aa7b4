//! HTTP API.
//!
//! | Method | Path               | Body                                   |
//! |--------|--------------------|----------------------------------------|
//! | POST   | `/api/v/discover`  | `{ cidr?, ips?, name_prefix? }`        |
//! | GET    | `/health`          | -                                      |
//!
//! Input errors are rejected with 400 and `{ error, message }` before any
//! discovery lookup. Per-target inventory failures never change the status
//! code; they are reported in the `errors` bucket of a 200 response.
//!
//! Each scan runs under a child of the daemon shutdown token, so a shutdown
//! turns in-flight scans into partial reports. A client disconnect drops the
//! handler future, which aborts the scan's tasks.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use netsync_core::error::InputError;
use netsync_core::types::ScanReport;
use netsync_reconciler::{InventoryClient, ReconciliationEngine, ScanRequest};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::health::HealthReport;

/// Discovery endpoint path.
pub const DISCOVER_PATH: &str = "/api/v/discover";

/// Health endpoint path.
pub const HEALTH_PATH: &str = "/health";

/// Shared state behind every handler.
pub struct AppState<C: InventoryClient> {
    engine: ReconciliationEngine<C>,
    max_targets: usize,
    shutdown: CancellationToken,
    started_at: Instant,
}

impl<C: InventoryClient> AppState<C> {
    /// Create state with a fresh shutdown token.
    pub fn new(engine: ReconciliationEngine<C>, max_targets: usize) -> Self {
        Self {
            engine,
            max_targets,
            shutdown: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Use an externally owned shutdown token.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Use an externally recorded start time.
    pub fn with_start_time(mut self, started_at: Instant) -> Self {
        self.started_at = started_at;
        self
    }

    /// The reconciliation engine.
    pub fn engine(&self) -> &ReconciliationEngine<C> {
        &self.engine
    }

    /// Current health snapshot.
    pub fn health(&self) -> HealthReport {
        HealthReport::new(
            self.engine.mode(),
            self.engine.discovery().len(),
            self.started_at.elapsed().as_secs(),
        )
    }
}

/// Build the API router.
pub fn router<C: InventoryClient>(state: Arc<AppState<C>>) -> Router {
    Router::new()
        .route(DISCOVER_PATH, post(discover::<C>))
        .route(HEALTH_PATH, get(health::<C>))
        .with_state(state)
}

async fn discover<C: InventoryClient>(
    State(state): State<Arc<AppState<C>>>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanReport>, ApiError> {
    let Json(request) = payload?;
    let cancel = state.shutdown.child_token();
    let report = state.engine.run(&request, state.max_targets, cancel).await?;
    Ok(Json(report))
}

async fn health<C: InventoryClient>(State(state): State<Arc<AppState<C>>>) -> Json<HealthReport> {
    Json(state.health())
}

/// Request-level API error.
#[derive(Debug)]
pub enum ApiError {
    /// Target resolution or name prefix validation failed.
    Input(InputError),
    /// Body is not a valid discovery request.
    MalformedBody {
        /// Status chosen by the JSON extractor (400, 415 or 422).
        status: StatusCode,
        /// Extractor message.
        message: String,
    },
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl From<InputError> for ApiError {
    fn from(err: InputError) -> Self {
        Self::Input(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            Self::Input(err) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: err.code(),
                    message: err.to_string(),
                },
            ),
            Self::MalformedBody { status, message } => (
                status,
                ErrorBody {
                    error: "InvalidRequest",
                    message,
                },
            ),
        };
        tracing::warn!(
            status = status.as_u16(),
            code = body.error,
            message = %body.message,
            "discovery request rejected"
        );
        (status, Json(body)).into_response()
    }
}
