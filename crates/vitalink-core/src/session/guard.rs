//! Connection guard that disconnects exactly once.

use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::transport::{GattTransport, PeripheralHandle};

/// Owns a live connection and disconnects it exactly once.
///
/// Call [`ConnectionGuard::release`] on every normal exit. If the owning
/// future is dropped before that (the caller abandoned the session or an
/// enclosing timeout fired), `Drop` spawns the same disconnect on the
/// current tokio runtime.
pub struct ConnectionGuard {
    transport: Arc<dyn GattTransport>,
    peripheral: Option<PeripheralHandle>,
}

impl ConnectionGuard {
    /// Create a new guard for a connected peripheral.
    pub fn new(transport: Arc<dyn GattTransport>, peripheral: PeripheralHandle) -> Self {
        Self {
            transport,
            peripheral: Some(peripheral),
        }
    }

    /// The guarded peripheral, until it is released.
    pub fn peripheral(&self) -> Option<&PeripheralHandle> {
        self.peripheral.as_ref()
    }

    /// Disconnect now. Returns `false` if the guard was already released.
    ///
    /// Disconnect failures are logged, not returned: the session outcome is
    /// already decided by the time cleanup runs.
    pub async fn release(&mut self) -> bool {
        let Some(peripheral) = self.peripheral.take() else {
            return false;
        };
        debug!(device = %peripheral.id, "Disconnecting");
        if let Err(e) = self.transport.disconnect(&peripheral).await {
            warn!(device = %peripheral.id, "Failed to disconnect: {}", e);
        }
        true
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        if let Some(peripheral) = self.peripheral.take() {
            let transport = Arc::clone(&self.transport);
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = transport.disconnect(&peripheral).await {
                        warn!(
                            device = %peripheral.id,
                            "Failed to disconnect in guard drop: {}", e
                        );
                    }
                });
            } else {
                warn!(
                    device = %peripheral.id,
                    "No tokio runtime available for disconnect in guard drop"
                );
            }
        }
    }
}

impl std::fmt::Debug for ConnectionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionGuard")
            .field("peripheral", &self.peripheral)
            .finish_non_exhaustive()
    }
}
