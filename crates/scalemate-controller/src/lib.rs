//! scalemate-controller — keeps derived autoscalers in sync with
//! workload annotations.
//!
//! The moving parts, in event order:
//!
//! ```text
//! watch collaborator ──▶ ChangeFilter ──▶ RetryQueue ──▶ worker pool
//!                                                            │
//!                                              Reconciler ◀──┘
//!                                                │
//!                     read-through caches ◀──────┼──────▶ mutation API
//! ```
//!
//! The watch/cache subsystem and the mutation API are external
//! collaborators, consumed through the traits in [`cluster`].

pub mod cluster;
pub mod controller;
pub mod error;
pub mod filter;
pub mod reconcile;

pub use cluster::{AutoscalerApi, AutoscalerCache, BoxFuture, WorkloadCache};
pub use controller::Controller;
pub use error::{ApiError, ControllerError, ReconcileError};
pub use filter::{ChangeFilter, FilterConfig, WatchEvent};
pub use reconcile::{Outcome, Reconciler};

#[cfg(test)]
pub(crate) mod fixtures;
