//! scalemate-core — domain types for the scalemate controller.
//!
//! A `Workload` declares scaling intent through annotations; the
//! controller keeps one `AutoscalerSpec` per opted-in workload in sync
//! with that intent. All types are JSON-serializable for the wire and
//! the composite key (`{namespace}/{name}`) addresses both resources.

pub mod annotations;
pub mod types;

pub use annotations::{
    ANNOTATION_MAX_REPLICAS, ANNOTATION_MIN_REPLICAS, ANNOTATION_TEMPLATES,
    DEFAULT_MAX_REPLICAS, DEFAULT_MIN_REPLICAS, parse_replica_bound,
};
pub use types::{
    AutoscalerSpec, MetricSpec, MetricTarget, OwnerReference, ParseKeyError, ScaleTargetRef,
    Workload, WorkloadKey,
};
