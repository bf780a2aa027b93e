//! The reconcile routine — composes the desired autoscaler for one
//! workload key and applies it.
//!
//! Outcome classification drives the retry queue: deliberate drops are
//! `Ok`, every `Err` is retryable. Configuration-shape problems (bad
//! bounds, unresolvable templates) never become errors; they resolve
//! to defaults or shrink the metric list.

use std::sync::Arc;

use scalemate_core::{
    ANNOTATION_MAX_REPLICAS, ANNOTATION_MIN_REPLICAS, ANNOTATION_TEMPLATES, AutoscalerSpec,
    DEFAULT_MAX_REPLICAS, DEFAULT_MIN_REPLICAS, MetricSpec, ScaleTargetRef, Workload, WorkloadKey,
    parse_replica_bound,
};
use scalemate_templates::TemplateStore;
use tracing::{info, warn};

use crate::cluster::{AutoscalerApi, AutoscalerCache, WorkloadCache};
use crate::error::ReconcileError;

/// How a reconciliation attempt ended, short of a retryable error.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The autoscaler did not exist and was created.
    Created(AutoscalerSpec),
    /// The autoscaler existed and was updated with the desired spec.
    Updated(AutoscalerSpec),
    /// The workload no longer exists; nothing to do.
    WorkloadGone,
    /// No template resolved to a usable metric. Misconfiguration, not
    /// a transient failure: dropped without mutation.
    NoUsableMetrics,
}

/// Derives and applies the autoscaler for a single workload key.
pub struct Reconciler {
    workloads: Arc<dyn WorkloadCache>,
    autoscalers: Arc<dyn AutoscalerCache>,
    api: Arc<dyn AutoscalerApi>,
    templates: TemplateStore,
}

impl Reconciler {
    pub fn new(
        workloads: Arc<dyn WorkloadCache>,
        autoscalers: Arc<dyn AutoscalerCache>,
        api: Arc<dyn AutoscalerApi>,
        templates: TemplateStore,
    ) -> Self {
        Self {
            workloads,
            autoscalers,
            api,
            templates,
        }
    }

    /// Reconcile one key. Idempotent: re-running against an unchanged
    /// workload applies an identical spec.
    pub async fn reconcile(&self, key: &WorkloadKey) -> Result<Outcome, ReconcileError> {
        let Some(workload) = self.workloads.get(key) else {
            // Deleted between enqueue and processing. The owner
            // cascade takes the autoscaler with it; not an error.
            info!(%key, "workload no longer exists, dropping");
            return Ok(Outcome::WorkloadGone);
        };

        // Don't derive an autoscaler from a rollout still in progress;
        // the next cache update retries the key.
        if workload.ready_replicas < workload.desired_replicas {
            return Err(ReconcileError::NotReady {
                key: key.clone(),
                ready: workload.ready_replicas,
                desired: workload.desired_replicas,
            });
        }

        let min = parse_replica_bound(
            &workload.annotations,
            ANNOTATION_MIN_REPLICAS,
            DEFAULT_MIN_REPLICAS,
        );
        let mut max = parse_replica_bound(
            &workload.annotations,
            ANNOTATION_MAX_REPLICAS,
            DEFAULT_MAX_REPLICAS,
        );
        if max < min {
            warn!(%key, min, max, "max bound below min, raising max to min");
            max = min;
        }

        let metrics = self.resolve_metrics(&workload);
        if metrics.is_empty() {
            warn!(%key, "no usable metric template, dropping without mutation");
            return Ok(Outcome::NoUsableMetrics);
        }

        let spec = compose(&workload, min, max, metrics);

        if self.autoscalers.contains(key) {
            self.api.update(spec.clone()).await?;
            info!(%key, "autoscaler updated");
            Ok(Outcome::Updated(spec))
        } else {
            self.api.create(spec.clone()).await?;
            info!(%key, min, max, metrics = spec.metrics.len(), "autoscaler created");
            Ok(Outcome::Created(spec))
        }
    }

    /// Resolve the comma-separated template list, skipping entries
    /// that fail to resolve.
    fn resolve_metrics(&self, workload: &Workload) -> Vec<MetricSpec> {
        let raw = workload.annotation(ANNOTATION_TEMPLATES).unwrap_or("");
        let mut metrics = Vec::new();
        for name in raw.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match self.templates.resolve(name) {
                Ok(metric) => metrics.push(metric),
                Err(err) => warn!(
                    workload = %workload.key(),
                    template = name,
                    error = %err,
                    "skipping unresolvable template"
                ),
            }
        }
        metrics
    }
}

/// Compose the desired autoscaler spec from its resolved inputs.
fn compose(workload: &Workload, min: u32, max: u32, metrics: Vec<MetricSpec>) -> AutoscalerSpec {
    AutoscalerSpec {
        namespace: workload.namespace.clone(),
        name: workload.name.clone(),
        scale_target: ScaleTargetRef {
            api_version: workload.api_version.clone(),
            kind: workload.kind.clone(),
            name: workload.name.clone(),
        },
        min_replicas: min,
        max_replicas: max,
        metrics,
        owner_references: workload.owner_references.clone(),
    }
}
