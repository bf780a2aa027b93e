//! In-memory collaborator fakes shared across the crate's tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use scalemate_core::{AutoscalerSpec, OwnerReference, Workload, WorkloadKey};
use scalemate_templates::TemplateStore;

use crate::cluster::{AutoscalerApi, AutoscalerCache, BoxFuture, WorkloadCache};
use crate::error::ApiError;

/// A ready workload of kind Deployment with one owner reference and no
/// annotations.
pub fn workload(namespace: &str, name: &str) -> Workload {
    Workload {
        namespace: namespace.to_string(),
        name: name.to_string(),
        kind: "Deployment".to_string(),
        api_version: "apps/v1".to_string(),
        annotations: HashMap::new(),
        owner_references: vec![OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: "ReplicaSet".to_string(),
            name: format!("{name}-7d4b9c"),
            uid: "0000-0000".to_string(),
        }],
        desired_replicas: 1,
        ready_replicas: 1,
    }
}

/// A template directory holding `cpu70` and `mem80`.
pub fn template_store() -> (tempfile::TempDir, TemplateStore) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cpu70"),
        "type: resource\nname: cpu\ntarget:\n  utilization:\n    average_utilization: 70\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("mem80"),
        "type: resource\nname: memory\ntarget:\n  utilization:\n    average_utilization: 80\n",
    )
    .unwrap();
    let store = TemplateStore::new(dir.path());
    (dir, store)
}

/// An in-memory cluster implementing all three collaborator traits.
#[derive(Default)]
pub struct FakeCluster {
    pub workloads: Mutex<HashMap<WorkloadKey, Workload>>,
    pub autoscalers: Mutex<HashMap<WorkloadKey, AutoscalerSpec>>,
    pub creates: AtomicUsize,
    pub updates: AtomicUsize,
    /// When set, create/update fail with a transport error.
    pub fail_mutations: AtomicBool,
    /// When set, the next create panics (cleared afterwards).
    pub panic_on_create: AtomicBool,
    pub unsynced: AtomicBool,
}

impl FakeCluster {
    pub fn with_workload(self, w: Workload) -> Self {
        self.workloads.lock().unwrap().insert(w.key(), w);
        self
    }

    pub fn put_workload(&self, w: Workload) {
        self.workloads.lock().unwrap().insert(w.key(), w);
    }

    pub fn autoscaler(&self, key: &WorkloadKey) -> Option<AutoscalerSpec> {
        self.autoscalers.lock().unwrap().get(key).cloned()
    }

    fn apply(&self, spec: AutoscalerSpec) -> Result<(), ApiError> {
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ApiError::Transport("connection refused".to_string()));
        }
        self.autoscalers.lock().unwrap().insert(spec.key(), spec);
        Ok(())
    }
}

impl WorkloadCache for FakeCluster {
    fn get(&self, key: &WorkloadKey) -> Option<Workload> {
        self.workloads.lock().unwrap().get(key).cloned()
    }

    fn has_synced(&self) -> bool {
        !self.unsynced.load(Ordering::SeqCst)
    }
}

impl AutoscalerCache for FakeCluster {
    fn contains(&self, key: &WorkloadKey) -> bool {
        self.autoscalers.lock().unwrap().contains_key(key)
    }

    fn has_synced(&self) -> bool {
        !self.unsynced.load(Ordering::SeqCst)
    }
}

impl AutoscalerApi for FakeCluster {
    fn create(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>> {
        if self.panic_on_create.swap(false, Ordering::SeqCst) {
            panic!("injected create panic");
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(self.apply(spec)))
    }

    fn update(&self, spec: AutoscalerSpec) -> BoxFuture<Result<(), ApiError>> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        Box::pin(std::future::ready(self.apply(spec)))
    }
}
