//! Session event system.
//!
//! Sessions publish their state transitions, dropped records and outcomes
//! on an optional broadcast channel supplied through
//! [`crate::SessionConfig::events`].

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::SessionState;
use crate::transport::DeviceId;

/// Events emitted by a running session.
///
/// All events are serializable for logging, persistence, and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The session moved to a new state.
    StateChanged {
        device: DeviceId,
        from: SessionState,
        to: SessionState,
    },
    /// A notification could not be parsed and was discarded.
    RecordDropped {
        device: DeviceId,
        /// Characteristic the notification arrived on.
        characteristic: String,
        /// Length of the discarded payload.
        length: usize,
    },
    /// The session finished and returned `samples` records.
    Completed { device: DeviceId, samples: usize },
    /// The session failed.
    Failed { device: DeviceId, error: String },
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: SessionEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
