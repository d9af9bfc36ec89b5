use std::sync::Arc;

use crate::error::CounterStoreError;
use crate::storage::CounterStore;
use crate::types::{CounterField, SubscriberId};

/// Key prefix used when none is configured.
pub const DEFAULT_COUNTER_KEY_PREFIX: &str = "callback:count:";

/// Build the counter-store key for a subscriber.
///
/// External monitoring reads the same keys, so the format is stable:
/// `<prefix><subscriber_id>`.
pub fn counter_key(prefix: &str, subscriber: &SubscriberId) -> String {
    format!("{}{}", prefix, subscriber.0)
}

/// Records delivery attempts and failures per subscriber.
#[derive(Clone)]
pub struct DeliveryMetrics {
    store: Arc<dyn CounterStore>,
    prefix: String,
}

impl DeliveryMetrics {
    pub fn new(store: Arc<dyn CounterStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }

    pub fn key(&self, subscriber: &SubscriberId) -> String {
        counter_key(&self.prefix, subscriber)
    }

    /// Single round trip, no buffering. Store errors are logged and returned.
    pub async fn increment(
        &self,
        subscriber: &SubscriberId,
        field: CounterField,
    ) -> Result<(), CounterStoreError> {
        let key = self.key(subscriber);
        match self.store.incr_field(&key, field.as_str()).await {
            Ok(_) => Ok(()),
            Err(err) => {
                tracing::debug!(
                    subscriber = %subscriber,
                    field = field.as_str(),
                    error = %err,
                    "failed to increment delivery counter"
                );
                Err(err)
            }
        }
    }

    pub async fn increase_total(&self, subscriber: &SubscriberId) -> Result<(), CounterStoreError> {
        self.increment(subscriber, CounterField::Total).await
    }

    pub async fn increase_failure(&self, subscriber: &SubscriberId) -> Result<(), CounterStoreError> {
        self.increment(subscriber, CounterField::Failure).await
    }
}
