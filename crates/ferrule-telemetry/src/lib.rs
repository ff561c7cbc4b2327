//! Ferrule Telemetry - logging setup for the Ferrule extension runtime.
//!
//! Every Ferrule crate logs through `tracing` with structured fields
//! (`plugin_id`, `scope`, `capability_type`, ...). This crate installs the
//! global subscriber: an `EnvFilter` built from a base level plus
//! per-target directives, and one of three formats written to stdout or
//! stderr.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferrule_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), ferrule_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("ferrule_plugins=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!(scope = "global", "Activating scope");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
