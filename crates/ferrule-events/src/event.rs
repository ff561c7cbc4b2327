//! Typed event definitions.

/// A named event channel with a typed payload.
///
/// Events are zero-sized marker types; the payload travels by value, so
/// every subscriber owns the value it is handed.
pub trait Event: Send + Sync + 'static {
    /// Stable name used in logs and errors.
    const NAME: &'static str;

    /// The value threaded through subscribers.
    type Payload: Clone + Send + 'static;
}
