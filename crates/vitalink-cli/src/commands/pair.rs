//! Pair command implementation.

use anyhow::{Context, Result};
use vitalink_core::{ReaderRegistry, SessionConfig};

use crate::config::Target;
use crate::util::{cancel_on_ctrl_c, open_central, show_progress};

pub async fn cmd_pair(target: &Target, config: SessionConfig, quiet: bool) -> Result<()> {
    let mut config = cancel_on_ctrl_c(config);
    if !quiet {
        config = show_progress(config);
    }

    let registry = ReaderRegistry::with_defaults(open_central().await?, config);
    registry
        .pair(target.kind, &target.device)
        .await
        .with_context(|| format!("Failed to pair with {}", target.device))?;

    if !quiet {
        eprintln!("Paired with {} ({})", target.device, target.kind);
    }
    Ok(())
}
