//! Single-attempt webhook callback delivery.
//!
//! Given a subscriber's [`DeliveryTarget`] and an opaque payload, the
//! [`Dispatcher`] performs **one** HTTP POST, decides whether the response
//! counts as delivered using the subscriber's [`ConfirmMode`], and records
//! attempt and failure counters per subscriber in a shared [`CounterStore`].
//!
//! ## Guarantees
//! - Exactly one `total` increment per call, at most one `failure`
//! - Per-call timeout, falling back to a configured default
//! - Counter-store errors never change the delivery result
//!
//! ## Non-Guarantees
//! - Retries, backoff or dead-lettering (owned by the caller)
//! - Ordering across concurrent deliveries
//! - Subscriber lifecycle management

mod confirm;
mod dispatcher;
mod error;
mod recorder;
mod storage;
mod types;

#[cfg(feature = "redis")]
mod storage_redis;

pub use confirm::{evaluate, Verdict};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::{CounterStoreError, DeliveryError, DeliveryOutcome, FailureKind};
pub use recorder::{counter_key, DeliveryMetrics, DEFAULT_COUNTER_KEY_PREFIX};
pub use storage::{CounterStore, InMemoryCounterStore, SubscriberMetrics};
pub use types::{ConfirmMode, CounterField, DeliveryTarget, SubscriberId};

#[cfg(feature = "redis")]
pub use storage_redis::RedisCounterStore;
