//! Deduplicating, rate-limited work queue.
//!
//! Three sets track each key's lifecycle: the FIFO of pending keys,
//! the `dirty` set (key wants processing), and the `processing` set
//! (a consumer holds the key right now). A key in `processing` that is
//! added again stays in `dirty` only, and `done` moves it back onto
//! the FIFO — this is what makes concurrent duplicate work impossible
//! without losing updates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

/// Default initial retry delay.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(5);

/// Default retry delay cap.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(1000);

struct Inner<T> {
    /// Pending keys in FIFO order. Subset of `dirty`.
    queue: VecDeque<T>,
    /// Keys that want processing (pending or re-added while in flight).
    dirty: HashSet<T>,
    /// Keys currently held by a consumer.
    processing: HashSet<T>,
    /// Consecutive failure count per key, cleared by `forget`.
    failures: HashMap<T, u32>,
    shutting_down: bool,
}

/// A work queue of keys pending reconciliation.
///
/// Clone-free sharing via `Arc<RetryQueue<T>>`; all operations take
/// `&self` and `get` is the only suspension point.
pub struct RetryQueue<T> {
    inner: Mutex<Inner<T>>,
    /// Wakes blocked `get` calls when work arrives or on shutdown.
    notify: Notify,
    base_delay: Duration,
    max_delay: Duration,
}

impl<T> Default for RetryQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RetryQueue<T>
where
    T: Clone + Eq + Hash + Send + Sync + 'static,
{
    /// Create a queue with the default backoff (5ms doubling, capped
    /// at 1000s).
    pub fn new() -> Self {
        Self::with_backoff(DEFAULT_BASE_DELAY, DEFAULT_MAX_DELAY)
    }

    /// Create a queue with a custom retry backoff range.
    pub fn with_backoff(base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                dirty: HashSet::new(),
                processing: HashSet::new(),
                failures: HashMap::new(),
                shutting_down: false,
            }),
            notify: Notify::new(),
            base_delay,
            max_delay,
        }
    }

    /// Mark a key pending.
    ///
    /// Duplicate adds collapse into one pending entry. If the key is
    /// currently being processed it stays dirty and `done` will
    /// re-queue it. Ignored after shutdown.
    pub fn add(&self, key: T) {
        let mut inner = self.inner.lock().unwrap();
        if inner.shutting_down {
            return;
        }
        if inner.dirty.contains(&key) {
            return;
        }
        inner.dirty.insert(key.clone());
        if inner.processing.contains(&key) {
            // Re-queued by done() once the in-flight work finishes.
            return;
        }
        inner.queue.push_back(key);
        drop(inner);
        self.notify.notify_one();
    }

    /// Take the next pending key, marking it processing.
    ///
    /// Blocks while the queue is empty. Returns `None` only once the
    /// queue has been shut down and drained.
    pub async fn get(&self) -> Option<T> {
        loop {
            // Register for a wakeup before inspecting state so an add
            // racing with the check is not missed.
            let notified = self.notify.notified();
            {
                let mut inner = self.inner.lock().unwrap();
                if let Some(key) = inner.queue.pop_front() {
                    inner.dirty.remove(&key);
                    inner.processing.insert(key.clone());
                    let more_pending = !inner.queue.is_empty();
                    drop(inner);
                    if more_pending {
                        // Cascade the wakeup: Notify stores at most one
                        // permit, so back-to-back adds can coalesce.
                        self.notify.notify_one();
                    }
                    return Some(key);
                }
                if inner.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Release the processing mark for a key.
    ///
    /// Must be called exactly once per successful `get`, whatever the
    /// outcome of the work; a key that went dirty while in flight is
    /// re-queued here.
    pub fn done(&self, key: &T) {
        let mut inner = self.inner.lock().unwrap();
        inner.processing.remove(key);
        if inner.dirty.contains(key) {
            inner.queue.push_back(key.clone());
            drop(inner);
            self.notify.notify_one();
        }
    }

    /// Clear backoff state for a key. Call on success.
    pub fn forget(&self, key: &T) {
        let mut inner = self.inner.lock().unwrap();
        inner.failures.remove(key);
    }

    /// Re-add a key after an increasing backoff delay.
    ///
    /// Each call bumps the key's failure count; the delay doubles per
    /// failure up to the cap. The retry count is unbounded.
    pub fn add_rate_limited(self: &Arc<Self>, key: T) {
        let delay = {
            let mut inner = self.inner.lock().unwrap();
            if inner.shutting_down {
                return;
            }
            let failures = inner.failures.entry(key.clone()).or_insert(0);
            *failures += 1;
            self.backoff_for(*failures)
        };

        debug!(delay_ms = delay.as_millis() as u64, "requeue with backoff");
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            queue.add(key);
        });
    }

    /// Consecutive failures recorded for a key.
    pub fn num_requeues(&self, key: &T) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.failures.get(key).copied().unwrap_or(0)
    }

    /// Number of pending keys (excludes in-flight keys).
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop accepting adds and release blocked `get` calls once the
    /// pending keys are drained.
    pub fn shut_down(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.shutting_down = true;
        drop(inner);
        self.notify.notify_waiters();
    }

    fn backoff_for(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exp).min(self.max_delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn queue() -> Arc<RetryQueue<String>> {
        Arc::new(RetryQueue::with_backoff(
            Duration::from_millis(1),
            Duration::from_secs(1),
        ))
    }

    #[tokio::test]
    async fn duplicate_adds_collapse() {
        let q = queue();
        q.add("a".to_string());
        q.add("a".to_string());
        q.add("a".to_string());
        assert_eq!(q.len(), 1);

        assert_eq!(q.get().await.unwrap(), "a");
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn fifo_order_across_keys() {
        let q = queue();
        q.add("a".to_string());
        q.add("b".to_string());
        q.add("c".to_string());

        assert_eq!(q.get().await.unwrap(), "a");
        assert_eq!(q.get().await.unwrap(), "b");
        assert_eq!(q.get().await.unwrap(), "c");
    }

    #[tokio::test]
    async fn readd_while_processing_waits_for_done() {
        let q = queue();
        q.add("a".to_string());
        let key = q.get().await.unwrap();

        // Re-added while in flight: stays dirty, not pending.
        q.add("a".to_string());
        assert_eq!(q.len(), 0);

        // Not deliverable before done() releases the key.
        let blocked = timeout(Duration::from_millis(50), q.get()).await;
        assert!(blocked.is_err());

        q.done(&key);
        assert_eq!(q.len(), 1);
        assert_eq!(q.get().await.unwrap(), "a");
    }

    #[tokio::test]
    async fn done_without_dirty_does_not_requeue() {
        let q = queue();
        q.add("a".to_string());
        let key = q.get().await.unwrap();
        q.done(&key);
        assert!(q.is_empty());
    }

    #[tokio::test]
    async fn shutdown_drains_then_signals() {
        let q = queue();
        q.add("a".to_string());
        q.add("b".to_string());
        q.shut_down();

        assert!(q.get().await.is_some());
        assert!(q.get().await.is_some());
        assert!(q.get().await.is_none());
    }

    #[tokio::test]
    async fn shutdown_releases_blocked_getters() {
        let q = queue();
        let waiter = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { q.get().await })
        };
        // Give the waiter time to block.
        tokio::time::sleep(Duration::from_millis(20)).await;
        q.shut_down();

        let got = timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn add_after_shutdown_is_ignored() {
        let q = queue();
        q.shut_down();
        q.add("a".to_string());
        assert!(q.is_empty());
        assert!(q.get().await.is_none());
    }

    #[tokio::test]
    async fn rate_limited_key_comes_back() {
        let q = queue();
        q.add_rate_limited("a".to_string());
        assert_eq!(q.num_requeues(&"a".to_string()), 1);

        let key = timeout(Duration::from_secs(1), q.get()).await.unwrap();
        assert_eq!(key.unwrap(), "a");
    }

    #[tokio::test]
    async fn forget_clears_failure_count() {
        let q = queue();
        q.add_rate_limited("a".to_string());
        q.add_rate_limited("a".to_string());
        assert_eq!(q.num_requeues(&"a".to_string()), 2);

        q.forget(&"a".to_string());
        assert_eq!(q.num_requeues(&"a".to_string()), 0);
    }

    #[tokio::test]
    async fn backoff_doubles_and_caps() {
        let q = Arc::new(RetryQueue::<String>::with_backoff(
            Duration::from_millis(5),
            Duration::from_millis(40),
        ));
        assert_eq!(q.backoff_for(1), Duration::from_millis(5));
        assert_eq!(q.backoff_for(2), Duration::from_millis(10));
        assert_eq!(q.backoff_for(3), Duration::from_millis(20));
        assert_eq!(q.backoff_for(4), Duration::from_millis(40));
        assert_eq!(q.backoff_for(10), Duration::from_millis(40));
    }

    #[tokio::test]
    async fn concurrent_workers_never_share_a_key() {
        let q = queue();
        q.add("a".to_string());

        let first = q.get().await.unwrap();
        q.add("a".to_string());

        // A second worker polling concurrently sees nothing until the
        // first worker finishes.
        let second = {
            let q = Arc::clone(&q);
            tokio::spawn(async move { timeout(Duration::from_millis(50), q.get()).await })
        };
        assert!(second.await.unwrap().is_err());

        q.done(&first);
        let retaken = timeout(Duration::from_secs(1), q.get()).await.unwrap();
        assert_eq!(retaken.unwrap(), "a");
    }
}
