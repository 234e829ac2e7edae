//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--config <path>`: Read this config file instead of searching
//! - `--endpoint <url>`: Backing store endpoint
//! - `--root <segment>`: Namespace root
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Print only values, no confirmations
//!
//! Every command addresses one run, selected with `--flow` and `--request`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Flowstate - inspect and edit per-run workflow state
#[derive(Parser, Debug)]
#[command(name = "flowstate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read configuration from this file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Backing store endpoint (overrides config and FLOWSTATE_ENDPOINT)
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Namespace root segment
    #[arg(long, global = true, value_name = "SEGMENT")]
    pub root: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print only values, no confirmations
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Workflow (flow) name
    #[arg(long, value_name = "NAME")]
    pub flow: String,

    /// Request identifier of the run
    #[arg(long, value_name = "ID")]
    pub request: String,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the value stored under a key
    Get {
        /// Key suffix within the run
        key: String,
    },

    /// Store a value under a key, overwriting any previous value
    Set {
        /// Key suffix within the run
        key: String,
        /// Value to store
        value: String,
    },

    /// Replace a key's value only if it currently holds OLD
    #[command(
        long_about = "Replace a key's value only if it currently holds OLD.\n\n\
            Fails without writing if the stored value differs from OLD, or if \
            another writer changed the key between the read and the write."
    )]
    Update {
        /// Key suffix within the run
        key: String,
        /// Expected current value
        old: String,
        /// Replacement value
        new: String,
    },

    /// Initialise counters to 0 for the given vertices
    Create {
        /// Vertex names
        #[arg(required = true, value_name = "VERTEX")]
        vertices: Vec<String>,
    },

    /// Increment a vertex counter and print the new count
    Incr {
        /// Vertex name
        vertex: String,
    },

    /// Show or change whether the run is active
    State {
        /// Mark the run active (true) or inactive (false)
        #[arg(long, value_name = "true|false")]
        set: Option<bool>,
    },

    /// Delete everything stored for the run
    Cleanup,
}
