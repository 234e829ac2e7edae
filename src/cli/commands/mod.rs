//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Calls one `StateStore` operation
//! 2. Formats and displays output
//!
//! # Async Commands
//!
//! Every store operation is a network round trip, so handlers are async.
//! `dispatch` builds a tokio runtime and blocks on the selected handler.

mod cleanup;
mod counters;
mod state;
mod values;

pub use cleanup::cleanup;
pub use counters::{create, incr};
pub use state::state;
pub use values::{get, set, update};

use anyhow::Result;

use crate::cli::args::Command;
use crate::store::KvStateStore;

/// Everything a handler needs.
#[derive(Debug)]
pub struct Context {
    /// Store already configured for the selected run
    pub store: KvStateStore,
    /// Suppress confirmations
    pub quiet: bool,
}

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(command, ctx))
}

async fn run(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Get { key } => values::get(ctx, &key).await,
        Command::Set { key, value } => values::set(ctx, &key, &value).await,
        Command::Update { key, old, new } => values::update(ctx, &key, &old, &new).await,
        Command::Create { vertices } => {
            let vertices: Vec<&str> = vertices.iter().map(String::as_str).collect();
            counters::create(ctx, &vertices).await
        }
        Command::Incr { vertex } => counters::incr(ctx, &vertex).await,
        Command::State { set } => state::state(ctx, set).await,
        Command::Cleanup => cleanup::cleanup(ctx).await,
    }
}
