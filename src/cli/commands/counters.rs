//! create and incr commands - vertex counters

use anyhow::{Context as _, Result};

use super::Context;
use crate::store::StateStore;

/// Initialise a counter at 0 for each vertex.
pub async fn create(ctx: &Context, vertices: &[&str]) -> Result<()> {
    ctx.store
        .create(vertices)
        .await
        .context("Failed to initialise counters")?;

    if !ctx.quiet {
        println!("Initialised {} counter(s)", vertices.len());
    }
    Ok(())
}

/// Increment `vertex`'s counter and print the new count.
pub async fn incr(ctx: &Context, vertex: &str) -> Result<()> {
    let count = ctx
        .store
        .increment_counter(vertex)
        .await
        .with_context(|| format!("Failed to increment '{}'", vertex))?;
    println!("{}", count);
    Ok(())
}
