use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Subscriber delivery configuration.
///
/// A `DeliveryTarget` describes *where* a callback goes and *how* its
/// response is judged. It is owned by the subscription registry and is
/// only ever read by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryTarget {
    /// Subscriber identity, also the counter key suffix.
    #[serde(alias = "subscription_id")]
    pub subscriber_id: SubscriberId,

    /// Destination for the HTTP POST.
    #[serde(alias = "callback_url")]
    pub endpoint_url: String,

    /// Per-subscriber timeout. Zero means "use the dispatcher default".
    /// Serialized as (possibly fractional) seconds.
    #[serde(default, with = "duration_secs", alias = "timeout_seconds")]
    pub timeout: Duration,

    /// Rule used to decide whether a response means "delivered".
    #[serde(default)]
    pub confirm_mode: ConfirmMode,

    /// Interpreted per `confirm_mode`.
    #[serde(default)]
    pub confirm_pattern: String,
}

impl DeliveryTarget {
    /// Create a target with no confirmation and the default timeout.
    pub fn new(subscriber_id: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            subscriber_id: SubscriberId(subscriber_id.into()),
            endpoint_url: endpoint_url.into(),
            timeout: Duration::ZERO,
            confirm_mode: ConfirmMode::None,
            confirm_pattern: String::new(),
        }
    }

    /// Set a per-subscriber timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Require the response status code to equal `code` exactly.
    pub fn confirm_status(mut self, code: impl Into<String>) -> Self {
        self.confirm_mode = ConfirmMode::StatusCode;
        self.confirm_pattern = code.into();
        self
    }

    /// Require the response body to match `pattern` somewhere.
    pub fn confirm_body_regex(mut self, pattern: impl Into<String>) -> Self {
        self.confirm_mode = ConfirmMode::RegexBody;
        self.confirm_pattern = pattern.into();
        self
    }

    /// Resolve the timeout actually applied to a delivery.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        if self.timeout.is_zero() {
            default
        } else {
            self.timeout
        }
    }
}

/// Confirmation strategy chosen by the subscriber.
///
/// Unrecognised values in serialized configuration fall back to `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfirmMode {
    /// Status code must equal the pattern string.
    StatusCode,
    /// Body must match the pattern as a regular expression.
    RegexBody,
    /// No verification.
    #[default]
    #[serde(other)]
    None,
}

/// Unique identifier for a subscriber.
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of subscriber IDs with other string identifiers. Registries that key
/// subscriptions by integer may send the id as a JSON number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriberId(pub String);

impl<'de> Deserialize<'de> for SubscriberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => SubscriberId(id),
            RawId::Number(id) => SubscriberId::from(id),
        })
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// Hash field touched by a counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterField {
    Total,
    Failure,
}

impl CounterField {
    /// Field name as read by external monitoring.
    pub fn as_str(self) -> &'static str {
        match self {
            CounterField::Total => "total",
            CounterField::Failure => "failure",
        }
    }
}

mod duration_secs {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        if value.subsec_nanos() == 0 {
            serializer.serialize_u64(value.as_secs())
        } else {
            serializer.serialize_f64(value.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
