//! Ferrule CLI - command-line host for the Ferrule extension runtime.
//!
//! Loads the layered configuration, seeds an in-memory store with the
//! configured installations of the extensions compiled into this binary,
//! and activates scopes on demand. Any activation failure ends the process
//! with a non-zero exit status.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod builtin;
mod commands;
mod host;

use commands::{OutputFormat, activate, tokenize};

/// Ferrule - capability-based extension runtime
#[derive(Parser)]
#[command(name = "ferrule")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Workspace root holding `.ferrule/config.toml` (defaults to the
    /// current directory)
    #[arg(long, global = true, env = "FERRULE_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Load this config file on top of the defaults instead of the
    /// user and workspace layers
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Activate a scope and list the services, components and routes it
    /// contributes
    Activate {
        /// Scope: `global`, `project:<id>` or `user:<id>`
        #[arg(short, long, default_value = "global")]
        scope: String,
    },

    /// Tokenize text with a tokenizer active in a scope
    Tokenize {
        /// Scope: `global`, `project:<id>` or `user:<id>`
        #[arg(short, long, default_value = "global")]
        scope: String,

        /// Tokenizer id (defaults to the lowest priority value)
        #[arg(short, long)]
        tokenizer: Option<String>,

        /// Text to tokenize
        text: String,
    },
}

/// The merged config plus the files it was read from.
fn load_config(cli: &Cli) -> Result<(ferrule_config::Config, Vec<PathBuf>)> {
    if let Some(path) = &cli.config {
        let config = ferrule_config::Config::load_file(path)?;
        return Ok((config, vec![path.clone()]));
    }
    let workspace_root = cli
        .workspace
        .clone()
        .or_else(|| std::env::current_dir().ok());
    let resolved = ferrule_config::Config::load(workspace_root.as_deref())?;
    Ok((resolved.config, resolved.loaded_files))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, loaded_files) = load_config(&cli)?;

    // Set up logging from config, with --verbose override.
    let log_config = match host::to_log_config(&config) {
        Ok(mut lc) => {
            if cli.verbose {
                "debug".clone_into(&mut lc.level);
            }
            lc
        },
        Err(e) => {
            eprintln!("Invalid logging config, using defaults: {e}");
            let level = if cli.verbose { "debug" } else { "info" };
            ferrule_telemetry::LogConfig::new(level)
                .with_format(ferrule_telemetry::LogFormat::Compact)
        },
    };
    if let Err(e) = ferrule_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }
    for file in &loaded_files {
        tracing::debug!(path = %file.display(), "Loaded config file");
    }

    match cli.command {
        Commands::Activate { scope } => {
            activate::run_activate(&config, &scope, cli.format).await?;
        },
        Commands::Tokenize {
            scope,
            tokenizer,
            text,
        } => {
            tokenize::run_tokenize(&config, &scope, tokenizer.as_deref(), &text, cli.format)
                .await?;
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_tokenize() {
        let cli = Cli::parse_from([
            "ferrule",
            "--format",
            "json",
            "tokenize",
            "--scope",
            "project:7",
            "-t",
            "simple",
            "%s items",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Tokenize {
                scope,
                tokenizer,
                text,
            } => {
                assert_eq!(scope, "project:7");
                assert_eq!(tokenizer.as_deref(), Some("simple"));
                assert_eq!(text, "%s items");
            },
            Commands::Activate { .. } => panic!("expected tokenize"),
        }
    }

    #[test]
    fn test_activate_defaults_to_global() {
        let cli = Cli::parse_from(["ferrule", "activate"]);
        assert!(matches!(cli.command, Commands::Activate { ref scope } if scope == "global"));
        assert!(!cli.verbose);
    }
}
