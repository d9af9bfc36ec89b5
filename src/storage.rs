use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::CounterStoreError;
use crate::types::CounterField;

/// Shared store holding per-subscriber delivery counters.
///
/// Implementations must make `incr_field` atomic with respect to
/// concurrent callers; the recorder does no client-side locking.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment hash `key`, field `field`, by one. Returns the new value.
    async fn incr_field(&self, key: &str, field: &str) -> Result<i64, CounterStoreError>;
}

/// Counter values for one subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriberMetrics {
    pub total: u64,
    pub failure: u64,
}

impl SubscriberMetrics {
    pub(crate) fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, i64)>) -> Self {
        let mut metrics = SubscriberMetrics::default();
        for (name, value) in fields {
            let value = value.max(0) as u64;
            if name == CounterField::Total.as_str() {
                metrics.total = value;
            } else if name == CounterField::Failure.as_str() {
                metrics.failure = value;
            }
        }
        metrics
    }
}

/// In-memory counter store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryCounterStore {
    hashes: Mutex<HashMap<String, HashMap<String, i64>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the counters stored under `key`.
    pub async fn snapshot(&self, key: &str) -> SubscriberMetrics {
        let hashes = self.hashes.lock().await;
        match hashes.get(key) {
            Some(fields) => SubscriberMetrics::from_fields(
                fields.iter().map(|(name, value)| (name.as_str(), *value)),
            ),
            None => SubscriberMetrics::default(),
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr_field(&self, key: &str, field: &str) -> Result<i64, CounterStoreError> {
        let mut hashes = self.hashes.lock().await;
        let value = hashes
            .entry(key.to_string())
            .or_default()
            .entry(field.to_string())
            .or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
