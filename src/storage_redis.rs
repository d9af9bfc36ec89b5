#[cfg(feature = "redis")]
use async_trait::async_trait;
#[cfg(feature = "redis")]
use redis::aio::ConnectionManager;
#[cfg(feature = "redis")]
use redis::AsyncCommands;
#[cfg(feature = "redis")]
use tokio::sync::OnceCell;

#[cfg(feature = "redis")]
use crate::error::CounterStoreError;
#[cfg(feature = "redis")]
use crate::storage::{CounterStore, SubscriberMetrics};

#[cfg(feature = "redis")]
impl From<redis::RedisError> for CounterStoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_io_error() {
            CounterStoreError::Unavailable(err.to_string())
        } else {
            CounterStoreError::Backend(err.to_string())
        }
    }
}

/// Redis-backed counter store.
///
/// Each increment is a single `HINCRBY`, so atomicity comes from Redis.
/// One multiplexed connection is opened on first use and shared by every
/// caller; it reconnects on its own after a dropped link.
#[cfg(feature = "redis")]
pub struct RedisCounterStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
}

#[cfg(feature = "redis")]
impl RedisCounterStore {
    pub fn new(client: redis::Client) -> Self {
        Self {
            client,
            conn: OnceCell::new(),
        }
    }

    async fn connection(&self) -> Result<ConnectionManager, CounterStoreError> {
        let conn = self
            .conn
            .get_or_try_init(|| ConnectionManager::new(self.client.clone()))
            .await?;
        Ok(conn.clone())
    }

    pub fn open(url: &str) -> Result<Self, CounterStoreError> {
        Ok(Self::new(redis::Client::open(url)?))
    }

    /// Read the counters stored under `key` with `HGETALL`.
    pub async fn snapshot(&self, key: &str) -> Result<SubscriberMetrics, CounterStoreError> {
        let mut conn = self.connection().await?;
        let fields: std::collections::HashMap<String, i64> = conn.hgetall(key).await?;
        Ok(SubscriberMetrics::from_fields(
            fields.iter().map(|(name, value)| (name.as_str(), *value)),
        ))
    }
}

#[cfg(feature = "redis")]
#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr_field(&self, key: &str, field: &str) -> Result<i64, CounterStoreError> {
        let mut conn = self.connection().await?;
        let value: i64 = conn.hincr(key, field, 1i64).await?;
        Ok(value)
    }
}
