//! Ferrule Core - Foundation types for the Ferrule extension runtime.
//!
//! This crate provides:
//! - [`PluginId`]: stable, validated extension identifier
//! - [`Scope`] / [`ScopeType`]: the installation context an extension applies to
//! - [`CapabilityType`]: the closed set of capability kinds the host understands
//! - Numeric identities for persisted rows ([`InstallationId`], [`ServiceBindingId`])
//!
//! Every other Ferrule crate builds on these types. This crate has no async
//! or runtime dependencies.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod capability;
pub mod error;
pub mod ids;
pub mod scope;

pub use capability::CapabilityType;
pub use error::{CoreError, CoreResult};
pub use ids::{InstallationId, PluginId, ServiceBindingId};
pub use scope::{Scope, ScopeType};
