//! Controller error types.

use std::time::Duration;

use scalemate_core::WorkloadKey;
use thiserror::Error;

/// Errors from the autoscaler mutation API. Every variant is treated
/// as transient and retried with backoff.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("api rejected request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("conflicting concurrent write: {0}")]
    Conflict(String),
}

/// Errors from a single reconciliation attempt.
///
/// Deliberate drops (workload gone, zero usable metrics) are not
/// errors; everything here is retryable.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("workload {key} is not ready ({ready}/{desired} replicas)")]
    NotReady {
        key: WorkloadKey,
        ready: u32,
        desired: u32,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Errors from running the controller itself.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("caches failed to sync within {0:?}")]
    SyncTimeout(Duration),
}
