//! cli
//!
//! Command-line interface layer for Flowstate.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Resolve configuration and build a store scoped to one run
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and hands a configured
//! [`crate::store::KvStateStore`] to the handlers, which go through the
//! [`crate::store::StateStore`] interface like any other caller.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::{Context as _, Result};
use tracing_subscriber::EnvFilter;

use crate::backend::BackendProvider;
use crate::core::config::{Config, StoreConfig};
use crate::store::{KvStateStore, StateStore};

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.debug);

    let config = load_config(&cli)?;
    if BackendProvider::parse(config.backend()) == Some(BackendProvider::Memory) {
        tracing::warn!(
            "backend 'memory' is process-local: state is dropped when this command exits"
        );
    }
    let mut store = KvStateStore::from_config(&config)
        .with_context(|| format!("Failed to set up backend at {}", config.endpoint()))?;
    store.configure(&cli.flow, &cli.request);

    let ctx = commands::Context {
        store,
        quiet: cli.quiet,
    };
    commands::dispatch(cli.command, &ctx)
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--debug` selects `debug`, else `warn`.
fn init_tracing(debug: bool) {
    let default = if debug { "flowstate=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // Fails only if a subscriber is already installed, as in-process tests do.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .ok();
}

/// Resolve configuration: file and environment, then command-line flags.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    config
        .with_overrides(StoreConfig {
            endpoint: cli.endpoint.clone(),
            root: cli.root.clone(),
            ..Default::default()
        })
        .context("Invalid command-line option")
}
