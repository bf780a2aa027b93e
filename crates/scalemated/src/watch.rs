//! Poll loop that stands in for a streaming watch.
//!
//! Lists workloads and autoscalers on an interval, refreshes the
//! read-through views, and feeds the resulting typed events to the
//! change filter. List failures are logged and retried on the next
//! tick; the views simply stay stale in between.

use std::time::Duration;

use scalemate_controller::ChangeFilter;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{ClusterClient, ClusterView};

/// Periodically refreshes the cluster views and emits change events.
pub struct WatchLoop {
    client: ClusterClient,
    view: ClusterView,
    filter: ChangeFilter,
    interval: Duration,
}

impl WatchLoop {
    pub fn new(
        client: ClusterClient,
        view: ClusterView,
        filter: ChangeFilter,
        interval: Duration,
    ) -> Self {
        Self {
            client,
            view,
            filter,
            interval,
        }
    }

    /// Run until the shutdown signal fires. Polls once immediately so
    /// the caches can sync during the startup wait.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_secs = self.interval.as_secs(), "watch loop started");
        loop {
            self.poll_once().await;
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("watch loop shutting down");
                    break;
                }
            }
        }
    }

    async fn poll_once(&self) {
        match self.client.list_workloads().await {
            Ok(listed) => {
                let events = self.view.apply_workloads(listed);
                debug!(events = events.len(), "workload snapshot refreshed");
                for event in events {
                    self.filter.handle(event);
                }
            }
            Err(err) => warn!(error = %err, "failed to list workloads"),
        }

        match self.client.list_autoscalers().await {
            Ok(listed) => self.view.apply_autoscalers(listed),
            Err(err) => warn!(error = %err, "failed to list autoscalers"),
        }
    }
}
