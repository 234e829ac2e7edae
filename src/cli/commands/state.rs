//! state command - show or change whether the run is active

use anyhow::{Context as _, Result};

use super::Context;
use crate::store::StateStore;

/// Print the active flag, or set it when `set` is given.
pub async fn state(ctx: &Context, set: Option<bool>) -> Result<()> {
    match set {
        Some(active) => {
            ctx.store
                .set_state(active)
                .await
                .context("Failed to set pipeline state")?;
            if !ctx.quiet {
                println!("State set to {}", active);
            }
        }
        None => {
            let active = ctx
                .store
                .get_state()
                .await
                .context("Failed to read pipeline state")?;
            println!("{}", active);
        }
    }
    Ok(())
}
