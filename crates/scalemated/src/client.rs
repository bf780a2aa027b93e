//! Cluster API client and the read-through views built from it.
//!
//! `ClusterClient` talks to the REST API; `ClusterView` holds the
//! in-memory snapshots the poll loop refreshes and implements the
//! controller's cache traits over them. A view reports synced after
//! its first successful list.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use scalemate_controller::{
    ApiError, AutoscalerApi, AutoscalerCache, BoxFuture, WatchEvent, WorkloadCache,
};
use scalemate_core::{AutoscalerSpec, Workload, WorkloadKey};
use thiserror::Error;

/// Errors from talking to the cluster API.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(reqwest::StatusCode),
}

/// Thin REST client for the cluster API.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    base_url: String,
    client: reqwest::Client,
}

impl ClusterClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn list_workloads(&self) -> Result<Vec<Workload>, ClientError> {
        let url = format!("{}/v1/workloads", self.base_url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    pub async fn list_autoscalers(&self) -> Result<Vec<AutoscalerSpec>, ClientError> {
        let url = format!("{}/v1/autoscalers", self.base_url);
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    async fn put_autoscaler(
        client: reqwest::Client,
        url: String,
        create: bool,
        spec: AutoscalerSpec,
    ) -> Result<(), ApiError> {
        let request = if create {
            client.post(url)
        } else {
            client.put(url)
        };
        let response = request
            .json(&spec)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT {
            // Optimistic-concurrency rejection; retried with backoff.
            return Err(ApiError::Conflict(spec.key().to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

impl AutoscalerApi for ClusterClient {
    fn create(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>> {
        let url = format!(
            "{}/v1/namespaces/{}/autoscalers",
            self.base_url, spec.namespace
        );
        Box::pin(Self::put_autoscaler(self.client.clone(), url, true, spec))
    }

    fn update(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>> {
        let url = format!(
            "{}/v1/namespaces/{}/autoscalers/{}",
            self.base_url, spec.namespace, spec.name
        );
        Box::pin(Self::put_autoscaler(self.client.clone(), url, false, spec))
    }
}

#[derive(Default)]
struct ViewInner {
    workloads: RwLock<HashMap<WorkloadKey, Workload>>,
    autoscalers: RwLock<HashSet<WorkloadKey>>,
    workloads_synced: AtomicBool,
    autoscalers_synced: AtomicBool,
}

/// Read-through snapshots of workloads and autoscalers.
#[derive(Default, Clone)]
pub struct ClusterView {
    inner: Arc<ViewInner>,
}

impl ClusterView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the workload snapshot, returning the typed events the
    /// change filter should see.
    ///
    /// Disappeared workloads produce no event: autoscaler removal is
    /// the owner cascade's job.
    pub fn apply_workloads(&self, listed: Vec<Workload>) -> Vec<WatchEvent> {
        let mut events = Vec::new();
        let mut next = HashMap::with_capacity(listed.len());

        {
            let current = self.inner.workloads.read().unwrap();
            for workload in listed {
                match current.get(&workload.key()) {
                    None => events.push(WatchEvent::Added(workload.clone())),
                    Some(old) if *old != workload => events.push(WatchEvent::Updated {
                        old: old.clone(),
                        new: workload.clone(),
                    }),
                    Some(_) => {}
                }
                next.insert(workload.key(), workload);
            }
        }

        *self.inner.workloads.write().unwrap() = next;
        self.inner.workloads_synced.store(true, Ordering::SeqCst);
        events
    }

    /// Replace the autoscaler key snapshot.
    pub fn apply_autoscalers(&self, listed: Vec<AutoscalerSpec>) {
        let keys = listed.into_iter().map(|s| s.key()).collect();
        *self.inner.autoscalers.write().unwrap() = keys;
        self.inner.autoscalers_synced.store(true, Ordering::SeqCst);
    }
}

impl WorkloadCache for ClusterView {
    fn get(&self, key: &WorkloadKey) -> Option<Workload> {
        self.inner.workloads.read().unwrap().get(key).cloned()
    }

    fn has_synced(&self) -> bool {
        self.inner.workloads_synced.load(Ordering::SeqCst)
    }
}

impl AutoscalerCache for ClusterView {
    fn contains(&self, key: &WorkloadKey) -> bool {
        self.inner.autoscalers.read().unwrap().contains(key)
    }

    fn has_synced(&self) -> bool {
        self.inner.autoscalers_synced.load(Ordering::SeqCst)
    }
}
