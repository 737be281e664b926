use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the newswire workspace.
///
/// Wraps argument validation, per-source failures, timeout and cancellation
/// outcomes, and an aggregate for multi-source fan-out attempts.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum NewswireError {
    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A source refused the request because of its rate limit.
    #[error("{source} is rate limited; retry in {retry_in_ms}ms")]
    RateLimited {
        /// Source id that refused the request.
        source: String,
        /// Milliseconds until the source becomes eligible again.
        retry_in_ms: u64,
    },

    /// An individual source returned a network or HTTP error.
    #[error("{source} failed: {msg}")]
    Source {
        /// Source id that failed.
        source: String,
        /// Human-readable error message (carries the HTTP status when known).
        msg: String,
    },

    /// A source responded but its payload could not be decoded.
    #[error("{source} returned an undecodable payload: {msg}")]
    Decode {
        /// Source id whose payload failed to decode.
        source: String,
        /// Decoder error message.
        msg: String,
    },

    /// A resource could not be found.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing resource, e.g. "subscription abc".
        what: String,
    },

    /// All selected sources failed and zero items were produced.
    #[error("all sources failed: {0:?}")]
    AllSourcesFailed(Vec<NewswireError>),

    /// An individual source call exceeded the per-source timeout.
    #[error("source timed out: {source}")]
    SourceTimeout {
        /// Source id that timed out.
        source: String,
    },

    /// The overall aggregation exceeded the configured deadline.
    #[error("aggregation request timed out")]
    RequestTimeout,

    /// The caller's cancellation handle fired.
    #[error("operation cancelled")]
    Cancelled,

    /// A push message is past its expiry and was dropped without delivery.
    #[error("message {message_id} expired")]
    Expired {
        /// Id of the expired message.
        message_id: String,
    },

    /// A transport send failed. Internal to the push pipeline; recorded per
    /// delivery and never surfaced through the enqueue path.
    #[error("transport error (permanent={permanent}): {msg}")]
    Transport {
        /// Whether retrying is pointless (bad token, unregistered device).
        permanent: bool,
        /// Transport error message.
        msg: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl NewswireError {
    /// Helper: build a `Source` error with the source id and message.
    pub fn source(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `Decode` error.
    pub fn decode(source: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            source: source.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error for a description of the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Helper: build a `SourceTimeout` error.
    pub fn source_timeout(source: impl Into<String>) -> Self {
        Self::SourceTimeout {
            source: source.into(),
        }
    }

    /// Helper: build a transient `Transport` error.
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transport {
            permanent: false,
            msg: msg.into(),
        }
    }

    /// Helper: build a permanent `Transport` error.
    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Transport {
            permanent: true,
            msg: msg.into(),
        }
    }

    /// True when the error is a timeout of either flavor.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::SourceTimeout { .. } | Self::RequestTimeout)
    }
}
