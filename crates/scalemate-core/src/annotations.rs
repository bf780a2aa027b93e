//! Annotation keys recognized on a workload, and bound parsing.
//!
//! The template annotation is the opt-in switch: a workload without it
//! is never reconciled. The replica bounds are optional and fall back
//! to defaults on any parse problem rather than surfacing an error.

use std::collections::HashMap;

/// Comma-separated list of metric template names. Non-empty value
/// opts the workload in.
pub const ANNOTATION_TEMPLATES: &str = "scalemate.io/template-list";

/// Lower replica bound, positive integer string.
pub const ANNOTATION_MIN_REPLICAS: &str = "scalemate.io/min-replicas";

/// Upper replica bound, positive integer string.
pub const ANNOTATION_MAX_REPLICAS: &str = "scalemate.io/max-replicas";

pub const DEFAULT_MIN_REPLICAS: u32 = 1;
pub const DEFAULT_MAX_REPLICAS: u32 = 3;

/// Read a replica bound annotation as a positive integer.
///
/// Absent, empty, non-numeric, zero, and negative values all resolve
/// to `default`. A bad bound is a configuration-shape problem, never a
/// retryable error.
pub fn parse_replica_bound(
    annotations: &HashMap<String, String>,
    key: &str,
    default: u32,
) -> u32 {
    match annotations.get(key).map(|v| v.trim().parse::<u32>()) {
        Some(Ok(n)) if n > 0 => n,
        _ => default,
    }
}
