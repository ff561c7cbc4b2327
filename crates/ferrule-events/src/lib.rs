//! Event pipeline for the Ferrule extension runtime.
//!
//! Unlike a broadcast bus, [`EventBus::emit`] threads one payload through
//! every subscriber of an event **in subscription order**, one at a time.
//! A subscriber may return a replacement payload, which the next subscriber
//! receives; returning `None` passes the current payload on unchanged. The
//! final payload is handed back to the emitter. This lets several extensions
//! progressively refine a value before the host consumes it.
//!
//! # Failure policy
//!
//! The first subscriber error aborts the emission and is returned as
//! [`EventError::SubscriberFailed`]; later subscribers do not run. A bus
//! built with [`EventBus::with_subscriber_timeout`] also aborts with
//! [`EventError::Timeout`] when a single subscriber exceeds the limit.
//!
//! # Example
//!
//! ```rust,ignore
//! struct SuggestionRequested;
//! impl Event for SuggestionRequested {
//!     const NAME: &'static str = "suggestion_requested";
//!     type Payload = String;
//! }
//!
//! let bus = EventBus::new();
//! bus.subscribe_sync::<SuggestionRequested, _>(|text| Ok(Some(text.trim().to_string())));
//! let refined = bus.emit::<SuggestionRequested>("  hello ".into()).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod error;
mod event;

pub use bus::{EventBus, SubscriberId};
pub use error::{EventError, EventResult, SubscriberError, SubscriberResult};
pub use event::Event;
