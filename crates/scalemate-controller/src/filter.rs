//! Change filter — decides which watch notifications are worth
//! reconciling.
//!
//! The filter's only side effect is enqueuing keys; it never calls the
//! mutation API. Notifications may be redelivered, so every decision
//! here has to be safe to re-drive.

use std::collections::HashSet;
use std::sync::Arc;

use scalemate_core::{ANNOTATION_TEMPLATES, Workload, WorkloadKey};
use scalemate_queue::RetryQueue;
use tracing::{debug, info};

/// A typed change notification from the watch collaborator.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    Added(Workload),
    Updated { old: Workload, new: Workload },
}

/// Immutable filter configuration, constructed once at startup.
#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Namespaces whose workloads are never reconciled.
    pub ignored_namespaces: HashSet<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            ignored_namespaces: ["kube-system", "kube-public"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Filters workload change notifications into retry-queue keys.
pub struct ChangeFilter {
    config: FilterConfig,
    queue: Arc<RetryQueue<WorkloadKey>>,
}

impl ChangeFilter {
    pub fn new(config: FilterConfig, queue: Arc<RetryQueue<WorkloadKey>>) -> Self {
        Self { config, queue }
    }

    /// Dispatch one typed event.
    pub fn handle(&self, event: WatchEvent) {
        match event {
            WatchEvent::Added(workload) => self.on_added(&workload),
            WatchEvent::Updated { old, new } => self.on_updated(&old, &new),
        }
    }

    /// A workload appeared (or was redelivered by a resync).
    pub fn on_added(&self, workload: &Workload) {
        let key = workload.key();

        if self.config.ignored_namespaces.contains(&workload.namespace) {
            debug!(%key, "workload in ignored namespace, skipping");
            return;
        }

        // Absent or empty template annotation means the workload never
        // opted in. Silent skip, no retry.
        match workload.annotation(ANNOTATION_TEMPLATES) {
            None | Some("") => {
                debug!(%key, "no template annotation, skipping");
                return;
            }
            Some(_) => {}
        }

        debug!(%key, "enqueueing added workload");
        self.queue.add(key);
    }

    /// A workload changed. Only a changed template annotation matters.
    pub fn on_updated(&self, old: &Workload, new: &Workload) {
        let key = new.key();

        if self.config.ignored_namespaces.contains(&new.namespace) {
            debug!(%key, "workload in ignored namespace, skipping");
            return;
        }

        let old_templates = old.annotation(ANNOTATION_TEMPLATES).unwrap_or("");
        let new_templates = new.annotation(ANNOTATION_TEMPLATES).unwrap_or("");

        if old_templates == new_templates {
            debug!(%key, "template annotation unchanged, skipping");
            return;
        }

        if new_templates.is_empty() {
            // Intent withdrawn. Removal stays with the owner-reference
            // cascade at workload deletion; the stale autoscaler is
            // left in place until then.
            info!(%key, "template annotation cleared, leaving autoscaler to owner cascade");
            return;
        }

        debug!(%key, "template annotation changed, enqueueing");
        self.queue.add(key);
    }
}
