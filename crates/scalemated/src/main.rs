//! scalemated — the scalemate controller daemon.
//!
//! Assembles the subsystems:
//! - Cluster client + read-through views (poll-based watch)
//! - Template store
//! - Change filter + retry queue
//! - Controller worker pool
//! - Optional creation webhook
//!
//! # Usage
//!
//! ```text
//! scalemated --api-url http://cluster:8443 --template-dir /etc/scalemate/templates
//! ```

mod client;
mod config;
mod watch;

use std::sync::Arc;

use clap::Parser;
use scalemate_controller::{ChangeFilter, Controller, Reconciler};
use scalemate_core::WorkloadKey;
use scalemate_notify::Notifier;
use scalemate_queue::RetryQueue;
use scalemate_templates::TemplateStore;
use tokio::sync::watch as watch_channel;
use tracing::info;

use crate::client::{ClusterClient, ClusterView};
use crate::config::Cli;
use crate::watch::WatchLoop;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scalemate=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    info!(api_url = %cli.api_url, template_dir = ?cli.template_dir, "scalemated starting");

    // ── Initialize subsystems ──────────────────────────────────

    let client = ClusterClient::new(&cli.api_url);
    let view = ClusterView::new();
    let templates = TemplateStore::new(&cli.template_dir);
    let queue: Arc<RetryQueue<WorkloadKey>> = Arc::new(RetryQueue::new());

    let filter = ChangeFilter::new(cli.filter_config(), Arc::clone(&queue));

    let reconciler = Reconciler::new(
        Arc::new(view.clone()),
        Arc::new(view.clone()),
        Arc::new(client.clone()),
        templates,
    );

    let mut controller = Controller::new(
        Arc::clone(&queue),
        reconciler,
        Arc::new(view.clone()),
        Arc::new(view.clone()),
    )
    .with_sync_timeout(cli.sync_timeout());

    if let Some(url) = &cli.webhook_url {
        info!(webhook = %url, "creation webhook enabled");
        controller = controller.with_notifier(Notifier::new(url));
    }

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch_channel::channel(false);
    let watch_shutdown = shutdown_rx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
        let _ = shutdown_tx.send(true);
    });

    // ── Run ────────────────────────────────────────────────────

    let watch_loop = WatchLoop::new(client, view, filter, cli.poll_interval());
    let watch_handle = tokio::spawn(async move {
        watch_loop.run(watch_shutdown).await;
    });

    // Blocks until shutdown; fails fast if the caches never sync.
    controller.run(cli.workers, shutdown_rx).await?;

    let _ = watch_handle.await;
    info!("scalemated stopped");
    Ok(())
}
