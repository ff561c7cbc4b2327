//! Ferrule Test - shared test utilities for the Ferrule runtime.
//!
//! Provides mock extensions and capabilities plus helpers for seeding a
//! [`MemoryPluginStore`](ferrule_storage::MemoryPluginStore) and building a
//! matching [`StaticCatalog`](ferrule_plugins::StaticCatalog).
//!
//! ```rust,ignore
//! let log = HookLog::new();
//! let mocks = [
//!     MockExtension::new("tok")
//!         .with_service(Service::tokenizer(MockTokenizer::new("simple", 10)))
//!         .with_log(&log),
//! ];
//! let store = Arc::new(MemoryPluginStore::new());
//! seed_all(&store, &Scope::global(), &mocks).await?;
//! let registry = PluginRegistry::new(store, Arc::new(catalog_of(&mocks)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
