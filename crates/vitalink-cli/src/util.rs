//! Shared helpers for command implementations.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vitalink_core::{BtleplugCentral, GattTransport, SessionConfig, SessionEvent};

/// Write output to file or stdout
pub fn write_output(output: Option<&PathBuf>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }
        None => {
            print!("{}", content);
            io::stdout().flush()?;
        }
    }
    Ok(())
}

/// Open the host's first Bluetooth adapter.
pub async fn open_central() -> Result<Arc<dyn GattTransport>> {
    let central = BtleplugCentral::new()
        .await
        .context("No usable Bluetooth adapter")?;
    Ok(Arc::new(central))
}

/// Cancel the session on Ctrl-C, so the device is still disconnected.
pub fn cancel_on_ctrl_c(config: SessionConfig) -> SessionConfig {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, disconnecting...");
            trigger.cancel();
        }
    });
    config.cancel_token(token)
}

/// Print state transitions to stderr while a session runs.
pub fn show_progress(config: SessionConfig) -> SessionConfig {
    let events = config.events.clone().unwrap_or_default();
    let mut receiver = events.subscribe();
    tokio::spawn(async move {
        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            };
            match event {
                SessionEvent::StateChanged { device, to, .. } if !to.is_terminal() => {
                    eprintln!("{}: {}", device, to);
                }
                SessionEvent::RecordDropped { length, .. } => {
                    debug!("Dropped malformed record ({} bytes)", length);
                }
                _ => {}
            }
        }
    });
    config.events(events)
}
