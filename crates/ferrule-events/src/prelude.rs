//! Prelude module - commonly used types for convenient import.
//!
//! Use `use ferrule_events::prelude::*;` to import all essential types.

pub use crate::{
    Event, EventBus, EventError, EventResult, SubscriberError, SubscriberId, SubscriberResult,
};
