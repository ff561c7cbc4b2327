//! Subcommand implementations.

pub(crate) mod activate;
pub(crate) mod tokenize;

use clap::ValueEnum;

/// How command results are printed to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text.
    #[default]
    Pretty,
    /// Pretty-printed JSON.
    Json,
}
