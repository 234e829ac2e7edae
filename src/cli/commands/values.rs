//! get, set and update commands - plain and guarded key access

use anyhow::{Context as _, Result};

use super::Context;
use crate::store::StateStore;

/// Print the value stored under `key`.
pub async fn get(ctx: &Context, key: &str) -> Result<()> {
    let value = ctx
        .store
        .get(key)
        .await
        .with_context(|| format!("Failed to read '{}'", key))?;
    println!("{}", value);
    Ok(())
}

/// Store `value` under `key`.
pub async fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    ctx.store
        .set(key, value)
        .await
        .with_context(|| format!("Failed to write '{}'", key))?;

    if !ctx.quiet {
        println!("Set {} = {}", key, value);
    }
    Ok(())
}

/// Replace `key`'s value with `new` if it currently holds `old`.
pub async fn update(ctx: &Context, key: &str, old: &str, new: &str) -> Result<()> {
    ctx.store
        .update(key, old, new)
        .await
        .with_context(|| format!("Failed to update '{}'", key))?;

    if !ctx.quiet {
        println!("Updated {}: {} -> {}", key, old, new);
    }
    Ok(())
}
