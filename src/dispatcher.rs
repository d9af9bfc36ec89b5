use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info_span, Instrument};

use crate::confirm::{self, Verdict};
use crate::error::DeliveryError;
use crate::recorder::{DeliveryMetrics, DEFAULT_COUNTER_KEY_PREFIX};
use crate::storage::CounterStore;
use crate::types::{DeliveryTarget, SubscriberId};

#[cfg(feature = "metrics")]
fn metric_inc_subscriber(name: &'static str, subscriber: &SubscriberId) {
    metrics::increment_counter!(name, "subscriber" => subscriber.0.clone());
}

#[cfg(not(feature = "metrics"))]
fn metric_inc_subscriber(_name: &'static str, _subscriber: &SubscriberId) {}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Applied when a target's own timeout is zero.
    pub default_timeout: Duration,
    pub connect_timeout: Option<Duration>,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Option<Duration>,
    pub user_agent: String,
    /// Counter keys are `<counter_key_prefix><subscriber_id>`.
    pub counter_key_prefix: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            connect_timeout: None,
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            user_agent: concat!("callback-dispatcher/", env!("CARGO_PKG_VERSION")).to_string(),
            counter_key_prefix: DEFAULT_COUNTER_KEY_PREFIX.to_string(),
        }
    }
}

/// Performs single-attempt callback deliveries.
///
/// Cloning is cheap: clones share the HTTP connection pool and the
/// counter store. Deliveries are independent and may run concurrently,
/// including several for the same subscriber.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    metrics: DeliveryMetrics,
    config: Arc<DispatcherConfig>,
}

impl Dispatcher {
    /// Build a dispatcher with its own pooled HTTP client.
    pub fn new(config: DispatcherConfig, store: Arc<dyn CounterStore>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout);
        if let Some(connect_timeout) = config.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let client = builder.build()?;

        Ok(Self::with_client(client, config, store))
    }

    /// Build a dispatcher around an existing HTTP client.
    ///
    /// The client's own timeout, if any, still applies on top of the
    /// per-delivery timeout.
    pub fn with_client(
        client: reqwest::Client,
        config: DispatcherConfig,
        store: Arc<dyn CounterStore>,
    ) -> Self {
        let metrics = DeliveryMetrics::new(store, config.counter_key_prefix.clone());
        Self {
            client,
            metrics,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Counter-store key holding `subscriber`'s counters.
    pub fn counter_key(&self, subscriber: &SubscriberId) -> String {
        self.metrics.key(subscriber)
    }

    /// Deliver `payload` to `target` once.
    ///
    /// Counts one attempt for the subscriber before doing anything else,
    /// and one failure for every error except [`DeliveryError::Pattern`].
    /// Counter-store errors are logged and never change the result.
    pub async fn deliver(
        &self,
        target: &DeliveryTarget,
        payload: impl Into<Bytes>,
    ) -> Result<(), DeliveryError> {
        let payload = payload.into();
        let subscriber = &target.subscriber_id;

        let span = info_span!(
            "callback_delivery",
            subscriber = %subscriber,
            url = %target.endpoint_url,
        );

        async move {
            let _ = self.metrics.increase_total(subscriber).await;
            metric_inc_subscriber("callback.delivery.attempt", subscriber);

            let started = Instant::now();
            let result = self.attempt(target, payload).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => {
                    metric_inc_subscriber("callback.delivery.success", subscriber);
                    tracing::debug!(elapsed_ms, "callback delivered");
                }
                Err(err) if err.counts_as_failure() => {
                    let _ = self.metrics.increase_failure(subscriber).await;
                    metric_inc_subscriber("callback.delivery.failure", subscriber);
                    tracing::warn!(elapsed_ms, kind = %err.kind(), "{}", err);
                }
                Err(err) => {
                    tracing::warn!(kind = %err.kind(), "{}", err);
                }
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn attempt(&self, target: &DeliveryTarget, payload: Bytes) -> Result<(), DeliveryError> {
        let timeout = target.effective_timeout(self.config.default_timeout);

        let request = self
            .client
            .post(target.endpoint_url.as_str())
            .timeout(timeout)
            .body(payload.clone())
            .build()
            .map_err(|source| DeliveryError::BuildRequest {
                source,
                payload: lossy(&payload),
            })?;

        let response = self
            .client
            .execute(request)
            .await
            .map_err(|source| DeliveryError::Transport {
                timed_out: source.is_timeout(),
                source,
                payload: lossy(&payload),
            })?;

        let status = response.status().as_u16();
        tracing::debug!(status, "received callback response");

        // Consumes the response; the connection goes back to the pool
        // or is dropped on every path out of here.
        let body = response
            .bytes()
            .await
            .map_err(|source| DeliveryError::ReadResponse {
                timed_out: source.is_timeout(),
                source,
                payload: lossy(&payload),
            })?;

        match confirm::evaluate(target.confirm_mode, &target.confirm_pattern, status, &body) {
            Ok(Verdict::Delivered) => Ok(()),
            Ok(Verdict::Rejected) => Err(DeliveryError::Confirmation {
                status,
                body: lossy(&body),
                payload: lossy(&payload),
            }),
            Err(source) => Err(DeliveryError::Pattern {
                subscriber: target.subscriber_id.clone(),
                source,
            }),
        }
    }
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{InMemoryCounterStore, SubscriberMetrics};

    #[test]
    fn default_config_matches_documented_values() {
        let config = DispatcherConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(30));
        assert_eq!(config.counter_key_prefix, "callback:count:");
        assert!(config.user_agent.starts_with("callback-dispatcher/"));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: DispatcherConfig =
            serde_json::from_str(r#"{"counter_key_prefix":"cc:event:"}"#).unwrap();
        assert_eq!(config.counter_key_prefix, "cc:event:");
        assert_eq!(config.pool_max_idle_per_host, 32);
    }

    #[tokio::test]
    async fn malformed_url_counts_attempt_and_failure() {
        let store = Arc::new(InMemoryCounterStore::new());
        let dispatcher = Dispatcher::new(DispatcherConfig::default(), store.clone()).unwrap();
        let target = DeliveryTarget::new("9", "not a url");

        let err = dispatcher.deliver(&target, "payload-9").await.unwrap_err();
        assert!(matches!(err, DeliveryError::BuildRequest { ref payload, .. } if payload == "payload-9"));

        let snapshot = store.snapshot(&dispatcher.counter_key(&target.subscriber_id)).await;
        assert_eq!(snapshot, SubscriberMetrics { total: 1, failure: 1 });
    }
}
