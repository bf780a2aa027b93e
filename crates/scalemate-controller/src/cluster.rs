//! Collaborator interfaces: the read-through caches the watch
//! subsystem maintains, and the mutation API autoscalers are written
//! through.
//!
//! The caches are read-only from the controller's perspective; every
//! write goes through [`AutoscalerApi`], which is the sole
//! serialization point for conflicting concurrent writes.

use std::future::Future;
use std::pin::Pin;

use scalemate_core::{AutoscalerSpec, Workload, WorkloadKey};

use crate::error::ApiError;

/// Boxed future for object-safe async trait methods.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// Synced, read-through view of workloads.
pub trait WorkloadCache: Send + Sync {
    /// Current workload state by key, `None` when the workload no
    /// longer exists.
    fn get(&self, key: &WorkloadKey) -> Option<Workload>;

    /// Whether the view has reached an initial synced state.
    fn has_synced(&self) -> bool;
}

/// Synced, read-through view of derived autoscalers. Used only for
/// existence checks.
pub trait AutoscalerCache: Send + Sync {
    fn contains(&self, key: &WorkloadKey) -> bool;

    /// Whether the view has reached an initial synced state.
    fn has_synced(&self) -> bool;
}

/// Mutation API for derived autoscalers. Both calls address the
/// resource by `(namespace, name)` and must be safe to retry.
pub trait AutoscalerApi: Send + Sync {
    fn create(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>>;
    fn update(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>>;
}
