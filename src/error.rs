//! Error types for workshop-deps
//!
//! Resolution failures abort a whole run and surface to the caller. Subscription
//! failures are collected and reported in aggregate. Each variant carries the
//! item or URL it concerns so callers can report it without extra bookkeeping.

use crate::types::{AppId, ItemId};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for workshop-deps operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for workshop-deps
#[derive(Debug, Error)]
pub enum Error {
    /// Item does not exist or is not publicly visible
    #[error("workshop item {id} not found or private")]
    NotFoundOrPrivate {
        /// The item that could not be resolved
        id: ItemId,
    },

    /// A dependency reference could not be parsed into an item ID
    ///
    /// Signals that the detail page markup changed, so it is never skipped.
    #[error("malformed dependency link {reference:?}: {reason}")]
    MalformedDependencyLink {
        /// The raw reference (usually an href)
        reference: String,
        /// Why it was rejected
        reason: String,
    },

    /// Metadata query or page fetch failed for a reason other than HTTP transport
    #[error("failed to fetch workshop item {id}: {message}")]
    TransientFetch {
        /// The item being fetched
        id: ItemId,
        /// Collaborator-supplied description
        message: String,
    },

    /// Non-success HTTP status from a remote endpoint
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// One or more subscribe requests failed
    #[error("{} item(s) could not be subscribed to: {}", failed.len(), join_ids(failed))]
    SubscriptionFailure {
        /// Items whose subscribe request failed
        failed: Vec<ItemId>,
    },

    /// The root item belongs to a different application than the current context
    #[error("workshop item {item} belongs to app {actual}, current context is app {expected}")]
    ContextMismatch {
        /// The root item
        item: ItemId,
        /// The context resolution ran under
        expected: AppId,
        /// The item's owning application
        actual: AppId,
    },

    /// The operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Download monitoring exceeded its configured maximum duration
    #[error("downloads did not complete within {elapsed:?} ({percent:.1}% done)")]
    MonitorTimeout {
        /// Time spent monitoring
        elapsed: Duration,
        /// Last observed percentage
        percent: f64,
    },

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "monitor.poll_interval")
        key: Option<String>,
    },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_ids(ids: &[ItemId]) -> String {
    ids.iter()
        .map(ItemId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Shorthand for a configuration error on a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }

    /// Whether this is a network/query failure rather than a content problem
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::TransientFetch { .. } | Error::Http { .. } | Error::Network(_)
        )
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFoundOrPrivate { .. } => "not_found_or_private",
            Error::MalformedDependencyLink { .. } => "malformed_dependency_link",
            Error::TransientFetch { .. } => "transient_fetch_failure",
            Error::Http { .. } => "http_error",
            Error::Network(_) => "network_error",
            Error::SubscriptionFailure { .. } => "subscription_failure",
            Error::ContextMismatch { .. } => "context_mismatch",
            Error::Cancelled => "cancelled",
            Error::MonitorTimeout { .. } => "monitor_timeout",
            Error::Config { .. } => "config_error",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
        }
    }
}
