//! Ferrule Plugins - scoped extension activation and capability resolution.
//!
//! Extensions ([`Extension`]) are installed per [`Scope`](ferrule_core::Scope)
//! in a [`PluginStore`](ferrule_storage::PluginStore). The first time a scope
//! is requested, [`PluginRegistry::get`] loads every installed extension
//! through an [`ExtensionLoader`], orders them by declared dependencies and
//! runs their hooks:
//!
//! 1. `services` - capability instances, resolved against their persisted
//!    bindings into the scope's [`ServiceRegistry`]
//! 2. `components` - UI components, name-suffixed into the
//!    [`ComponentRegistry`]
//! 3. `routes` - mounts under `/plugins/{id}`
//! 4. `on_activate`
//!
//! Activation is all-or-nothing: if any hook fails, the scope's registries
//! are cleared and the error is returned. The resulting [`ScopeHandle`] is
//! the resolution API:
//!
//! ```rust,ignore
//! let handle = registry.get(&Scope::project("42")?).await?;
//! let storage = handle
//!     .services()
//!     .await
//!     .resolve::<StorageCapability>(&PluginId::new("s3-storage")?, "s3");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod components;
pub mod context;
pub mod error;
pub mod events;
pub mod extension;
pub mod handle;
pub mod loader;
pub mod registry;
pub mod services;

pub use components::{Component, ComponentRecord, ComponentRegistry};
pub use context::{PluginContext, RouteContext, RouteMount};
pub use error::{Hook, HookError, HookResult, PluginError, PluginResult};
pub use events::{ScopeActivated, ScopeDeactivated, ScopeLifecycle};
pub use extension::{Extension, ExtensionHooks, ExtensionMetadata, ProvidedCapability};
pub use handle::{ScopeHandle, ScopeState};
pub use loader::{ExtensionLoader, LoadedExtension, StaticCatalog};
pub use registry::PluginRegistry;
pub use services::{RegisteredService, ServiceRegistry};
