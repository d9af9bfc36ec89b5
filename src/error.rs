use std::fmt;

use thiserror::Error;

use crate::types::SubscriberId;

/// Errors returned by a single delivery attempt.
///
/// Every variant except [`DeliveryError::Pattern`] has already been
/// counted as a failure by the time it reaches the caller.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The outbound request could not be constructed.
    #[error("callback delivery failed, build request error: {source}, data=[{payload}]")]
    BuildRequest {
        #[source]
        source: reqwest::Error,
        payload: String,
    },

    /// Network failure or timeout while sending.
    #[error("callback delivery failed, send request error: {source}, data=[{payload}]")]
    Transport {
        #[source]
        source: reqwest::Error,
        timed_out: bool,
        payload: String,
    },

    /// Response arrived but its body could not be read.
    #[error("callback delivery failed, read response error: {source}, data=[{payload}]")]
    ReadResponse {
        #[source]
        source: reqwest::Error,
        timed_out: bool,
        payload: String,
    },

    /// Response did not satisfy the subscriber's confirmation rule.
    #[error("callback delivery failed, received response {status}: {body}, data=[{payload}]")]
    Confirmation {
        status: u16,
        body: String,
        payload: String,
    },

    /// `RegexBody` confirmation pattern does not compile.
    /// Configuration defect, not counted as a delivery failure.
    #[error("callback delivery failed, build regexp error for subscriber {subscriber}: {source}")]
    Pattern {
        subscriber: SubscriberId,
        #[source]
        source: regex::Error,
    },
}

impl DeliveryError {
    pub fn kind(&self) -> FailureKind {
        match self {
            DeliveryError::BuildRequest { .. } => FailureKind::BuildRequest,
            DeliveryError::Transport { .. } => FailureKind::Transport,
            DeliveryError::ReadResponse { .. } => FailureKind::ReadResponse,
            DeliveryError::Confirmation { .. } => FailureKind::Confirmation,
            DeliveryError::Pattern { .. } => FailureKind::Pattern,
        }
    }

    /// Whether this error incremented the subscriber's `failure` counter.
    pub fn counts_as_failure(&self) -> bool {
        !matches!(self, DeliveryError::Pattern { .. })
    }

    /// Whether the delivery timeout expired, either while waiting for
    /// the response or while draining its body.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            DeliveryError::Transport { timed_out: true, .. }
                | DeliveryError::ReadResponse { timed_out: true, .. }
        )
    }
}

/// Final outcome of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(FailureKind),
}

impl DeliveryOutcome {
    pub fn from_result(result: &Result<(), DeliveryError>) -> Self {
        match result {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(err) => DeliveryOutcome::Failed(err.kind()),
        }
    }
}

/// Classification of a failed delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    BuildRequest,
    Transport,
    ReadResponse,
    Confirmation,
    Pattern,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::BuildRequest =>
                write!(f, "request could not be built"),
            FailureKind::Transport =>
                write!(f, "network error or timeout"),
            FailureKind::ReadResponse =>
                write!(f, "response body unreadable"),
            FailureKind::Confirmation =>
                write!(f, "response not confirmed"),
            FailureKind::Pattern =>
                write!(f, "invalid confirmation pattern"),
        }
    }
}

/// Errors raised by a counter store.
#[derive(Debug, Error)]
pub enum CounterStoreError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("counter store backend error: {0}")]
    Backend(String),
}
