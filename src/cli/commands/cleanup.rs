//! cleanup command - delete everything stored for the run

use anyhow::{Context as _, Result};

use super::Context;
use crate::store::StateStore;

/// Delete every entry under the run's namespace.
pub async fn cleanup(ctx: &Context) -> Result<()> {
    ctx.store.cleanup().await.context("Failed to clean up")?;

    if !ctx.quiet {
        if let Some(namespace) = ctx.store.namespace() {
            println!("Removed {}", namespace);
        }
    }
    Ok(())
}
