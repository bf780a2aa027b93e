//! scalemate-queue — the pending-work structure behind the controller.
//!
//! A `RetryQueue<T>` holds keys waiting for reconciliation. It
//! guarantees:
//!
//! - one pending entry per key, however many times it is added
//! - at most one in-flight consumer per key at any instant
//! - a key re-added while in flight is re-queued as soon as the
//!   in-flight work calls `done`, so no update is lost
//! - failed keys come back with capped exponential backoff
//!
//! Consumers drive it with `get` → work → `done`, calling `forget` on
//! success or `add_rate_limited` on retryable failure.

pub mod queue;

pub use queue::RetryQueue;
