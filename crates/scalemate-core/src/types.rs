//! Domain types shared across the scalemate crates.
//!
//! These mirror the shape of the resources the controller reads and
//! writes: the workload whose annotations express scaling intent, and
//! the autoscaler derived from it. Both are addressed by a
//! namespace-scoped composite key.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when a string cannot be split into a workload key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed key: {0:?} (expected \"namespace/name\")")]
pub struct ParseKeyError(pub String);

/// Composite key identifying a workload (and, by convention, the
/// autoscaler derived from it).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkloadKey {
    pub namespace: String,
    pub name: String,
}

impl WorkloadKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for WorkloadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for WorkloadKey {
    type Err = ParseKeyError;

    /// Parse a `namespace/name` string. Exactly one separator, both
    /// parts non-empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((ns, name))
                if !ns.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(ns, name))
            }
            _ => Err(ParseKeyError(s.to_string())),
        }
    }
}

// ── Workload ──────────────────────────────────────────────────────

/// A deployed workload as seen through the read-through cache.
///
/// The controller never mutates a workload; annotations are read-only
/// declared intent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Workload {
    pub namespace: String,
    pub name: String,
    /// Resource kind, used to address the scale target (e.g. "Deployment").
    pub kind: String,
    /// API version of the workload resource (e.g. "apps/v1").
    pub api_version: String,
    /// Annotation key → value. Keys are unique.
    #[serde(default)]
    pub annotations: HashMap<String, String>,
    /// Owner references, copied verbatim onto the derived autoscaler so
    /// an external garbage collector cascades deletion.
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
    /// Replica count the workload is asking for.
    pub desired_replicas: u32,
    /// Replica count currently ready.
    pub ready_replicas: u32,
}

impl Workload {
    /// The composite key for this workload.
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.name)
    }

    /// Annotation value by key, `None` when absent.
    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations.get(key).map(String::as_str)
    }
}

/// Back-link used by an external garbage collector to cascade deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

// ── Autoscaler ────────────────────────────────────────────────────

/// Reference to the resource an autoscaler scales.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScaleTargetRef {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

/// Desired state of the autoscaler derived from a workload.
///
/// Mirrors the workload's identity; a composed spec always carries at
/// least one metric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AutoscalerSpec {
    pub namespace: String,
    pub name: String,
    pub scale_target: ScaleTargetRef,
    pub min_replicas: u32,
    pub max_replicas: u32,
    pub metrics: Vec<MetricSpec>,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

impl AutoscalerSpec {
    /// The composite key for this autoscaler.
    pub fn key(&self) -> WorkloadKey {
        WorkloadKey::new(&self.namespace, &self.name)
    }
}

// ── Metrics ───────────────────────────────────────────────────────

/// One metric an autoscaler scales on. Decoded from a named template
/// file or carried inline on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricSpec {
    /// A per-pod resource metric ("cpu", "memory").
    Resource { name: String, target: MetricTarget },
    /// An arbitrary metric averaged across pods.
    Pods { metric: String, target: MetricTarget },
    /// A metric originating outside the cluster.
    External { metric: String, target: MetricTarget },
}

/// How a metric value is compared against its target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MetricTarget {
    /// Target as a percentage of the requested resource.
    Utilization { average_utilization: u32 },
    /// Target as an average quantity across pods (e.g. "100m", "500Mi").
    AverageValue { average_value: String },
    /// Target as an absolute quantity.
    Value { value: String },
}
