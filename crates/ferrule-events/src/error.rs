//! Event bus errors.

use std::time::Duration;

use thiserror::Error;

use crate::bus::SubscriberId;

/// Error type subscribers return.
pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// What a subscriber returns: `Some` replaces the payload, `None` keeps it.
pub type SubscriberResult<P> = Result<Option<P>, SubscriberError>;

/// Errors that abort an emission.
#[derive(Debug, Error)]
pub enum EventError {
    /// A subscriber returned an error.
    #[error("subscriber {subscriber} of '{event}' failed: {source}")]
    SubscriberFailed {
        /// Event name.
        event: &'static str,
        /// The failing subscriber.
        subscriber: SubscriberId,
        /// The subscriber's error.
        #[source]
        source: SubscriberError,
    },

    /// A subscriber exceeded the bus's subscriber timeout.
    #[error("subscriber {subscriber} of '{event}' timed out after {timeout:?}")]
    Timeout {
        /// Event name.
        event: &'static str,
        /// The slow subscriber.
        subscriber: SubscriberId,
        /// The configured limit.
        timeout: Duration,
    },
}

/// Result type for event bus operations.
pub type EventResult<T> = Result<T, EventError>;
