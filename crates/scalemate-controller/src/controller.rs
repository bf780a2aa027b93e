//! Worker pool and controller lifecycle.
//!
//! `Controller::run` blocks until the shutdown signal fires: it waits
//! for the read-through caches to sync, spawns the workers, and on
//! shutdown shuts the queue down and lets the workers drain it.
//! Each queue item is processed on its own task so a panic in one
//! reconciliation is contained, logged, and never takes a worker down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use scalemate_core::WorkloadKey;
use scalemate_notify::Notifier;
use scalemate_queue::RetryQueue;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cluster::{AutoscalerCache, WorkloadCache};
use crate::error::ControllerError;
use crate::reconcile::{Outcome, Reconciler};

/// Default bound on the startup cache-sync wait.
const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(60);

/// How often the sync barrier re-checks the caches.
const SYNC_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Drives reconciliation: cache-sync barrier, worker pool, shutdown.
pub struct Controller {
    queue: Arc<RetryQueue<WorkloadKey>>,
    reconciler: Arc<Reconciler>,
    workloads: Arc<dyn WorkloadCache>,
    autoscalers: Arc<dyn AutoscalerCache>,
    notifier: Option<Arc<Notifier>>,
    sync_timeout: Duration,
}

impl Controller {
    pub fn new(
        queue: Arc<RetryQueue<WorkloadKey>>,
        reconciler: Reconciler,
        workloads: Arc<dyn WorkloadCache>,
        autoscalers: Arc<dyn AutoscalerCache>,
    ) -> Self {
        Self {
            queue,
            reconciler: Arc::new(reconciler),
            workloads,
            autoscalers,
            notifier: None,
            sync_timeout: DEFAULT_SYNC_TIMEOUT,
        }
    }

    /// Attach a best-effort webhook fired when autoscalers are created.
    pub fn with_notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(Arc::new(notifier));
        self
    }

    /// Override the startup cache-sync wait.
    pub fn with_sync_timeout(mut self, timeout: Duration) -> Self {
        self.sync_timeout = timeout;
        self
    }

    /// Run the controller until the shutdown signal fires, then drain.
    ///
    /// `workers` is the number of concurrent reconcile loops; one is
    /// the minimal valid configuration.
    pub async fn run(
        &self,
        workers: usize,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), ControllerError> {
        info!("waiting for caches to sync");
        self.wait_for_cache_sync().await?;

        info!(workers, "starting workers");
        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers.max(1) {
            let queue = Arc::clone(&self.queue);
            let reconciler = Arc::clone(&self.reconciler);
            let notifier = self.notifier.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(id, queue, reconciler, notifier).await;
            }));
        }

        let _ = shutdown.changed().await;
        info!("shutdown signal received, draining queue");
        self.queue.shut_down();

        for handle in handles {
            let _ = handle.await;
        }
        info!("all workers stopped");
        Ok(())
    }

    /// Block until both read-through views report synced, bounded by
    /// the configured timeout.
    async fn wait_for_cache_sync(&self) -> Result<(), ControllerError> {
        let deadline = Instant::now() + self.sync_timeout;
        while !(self.workloads.has_synced() && self.autoscalers.has_synced()) {
            if Instant::now() >= deadline {
                return Err(ControllerError::SyncTimeout(self.sync_timeout));
            }
            tokio::time::sleep(SYNC_POLL_INTERVAL).await;
        }
        Ok(())
    }
}

/// One worker: get → reconcile → done, until shutdown.
async fn worker_loop(
    id: usize,
    queue: Arc<RetryQueue<WorkloadKey>>,
    reconciler: Arc<Reconciler>,
    notifier: Option<Arc<Notifier>>,
) {
    debug!(worker = id, "worker started");
    while let Some(key) = queue.get().await {
        // Per-item task: the join boundary turns a panic into a logged
        // error instead of a dead worker. The item is dropped; the
        // next notification for its key re-enqueues it.
        let item = tokio::spawn(process_item(
            Arc::clone(&queue),
            Arc::clone(&reconciler),
            notifier.clone(),
            key.clone(),
        ));
        if let Err(join_err) = item.await
            && join_err.is_panic()
        {
            error!(worker = id, %key, "reconciliation panicked, dropping item");
        }
        queue.done(&key);
    }
    debug!(worker = id, "worker stopped");
}

/// Process one key and classify the outcome for the queue.
async fn process_item(
    queue: Arc<RetryQueue<WorkloadKey>>,
    reconciler: Arc<Reconciler>,
    notifier: Option<Arc<Notifier>>,
    key: WorkloadKey,
) {
    match reconciler.reconcile(&key).await {
        Ok(outcome) => {
            queue.forget(&key);
            if let (Outcome::Created(spec), Some(notifier)) = (&outcome, &notifier) {
                // Off the critical path: fire and forget.
                let text = format!("created autoscaler {}/{}", spec.namespace, spec.name);
                let notifier = Arc::clone(notifier);
                tokio::spawn(async move {
                    if let Err(err) = notifier.send(&text).await {
                        warn!(error = %err, "webhook notification failed");
                    }
                });
            }
        }
        Err(err) => {
            warn!(
                %key,
                error = %err,
                attempt = queue.num_requeues(&key) + 1,
                "reconciliation failed, requeueing with backoff"
            );
            queue.add_rate_limited(key);
        }
    }
}
