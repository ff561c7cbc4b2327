//! Ferrule Storage - persistence interface for installations and service
//! bindings.
//!
//! The runtime reads three things from persistence (see [`PluginStore`]):
//!
//! - the installation of one extension in one scope
//! - every installation in a scope, in installation order
//! - the service bindings matching `(installation, capability type, id)`
//!
//! It never writes. Creating installations and bindings is the
//! administrative workflow's job; [`MemoryPluginStore`] implements that
//! workflow in memory for tests and for hosts seeded from configuration.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod memory;
pub mod records;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryPluginStore;
pub use records::{ExtensionRecord, Installation, ServiceBinding};
pub use store::PluginStore;
