//! Session timeouts, cancellation and observability hooks.
//!
//! One [`SessionConfig`] is shared by every session a reader starts. The
//! overall timeout bounds each `pair` or `read` call from the moment it is
//! made; the inertia and step timeouts only matter to the passive and
//! framed sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::events::EventDispatcher;
use crate::metrics::SessionMetrics;

/// Default bound on a whole `read` or `pair` call.
pub const DEFAULT_OVERALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Default quiet period that ends a passive collection.
pub const DEFAULT_INERTIA_TIMEOUT: Duration = Duration::from_secs(2);

/// Default bound on one request/response step of a framed exchange.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeouts and hooks for one session.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use vitalink_core::SessionConfig;
///
/// let config = SessionConfig::default()
///     .overall_timeout(Duration::from_secs(60))
///     .inertia_timeout(Duration::from_secs(3));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Deadline for the whole session, measured from the call.
    pub overall_timeout: Duration,
    /// Quiet period after the last sample that ends a passive collection.
    pub inertia_timeout: Duration,
    /// Deadline for each request/response step of a framed exchange.
    pub step_timeout: Duration,
    /// Cancelling this token aborts the session with [`Error::Cancelled`].
    pub cancel: Option<CancellationToken>,
    /// Receives state transitions and outcomes.
    pub events: Option<EventDispatcher>,
    /// Shared counters.
    pub metrics: Option<Arc<SessionMetrics>>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            overall_timeout: DEFAULT_OVERALL_TIMEOUT,
            inertia_timeout: DEFAULT_INERTIA_TIMEOUT,
            step_timeout: DEFAULT_STEP_TIMEOUT,
            cancel: None,
            events: None,
            metrics: None,
        }
    }
}

impl SessionConfig {
    /// Create a new session config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timeouts for a meter lying next to the host.
    pub fn fast() -> Self {
        Self {
            overall_timeout: Duration::from_secs(15),
            inertia_timeout: Duration::from_secs(1),
            step_timeout: Duration::from_secs(2),
            ..Self::default()
        }
    }

    /// Long timeouts for meters with thousands of stored records.
    pub fn patient() -> Self {
        Self {
            overall_timeout: Duration::from_secs(120),
            inertia_timeout: Duration::from_secs(5),
            step_timeout: Duration::from_secs(10),
            ..Self::default()
        }
    }

    /// Set the overall deadline.
    #[must_use]
    pub fn overall_timeout(mut self, timeout: Duration) -> Self {
        self.overall_timeout = timeout;
        self
    }

    /// Set the passive inertia timeout.
    #[must_use]
    pub fn inertia_timeout(mut self, timeout: Duration) -> Self {
        self.inertia_timeout = timeout;
        self
    }

    /// Set the framed step timeout.
    #[must_use]
    pub fn step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = timeout;
        self
    }

    /// Attach a cancellation token.
    #[must_use]
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Attach an event dispatcher.
    #[must_use]
    pub fn events(mut self, events: EventDispatcher) -> Self {
        self.events = Some(events);
        self
    }

    /// Attach shared metrics.
    #[must_use]
    pub fn metrics(mut self, metrics: Arc<SessionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Check that every timeout is non-zero and that the inertia and step
    /// timeouts fit inside the overall deadline.
    pub fn validate(&self) -> Result<()> {
        if self.overall_timeout.is_zero() {
            return Err(Error::invalid_config("overall timeout must be non-zero"));
        }
        if self.inertia_timeout.is_zero() {
            return Err(Error::invalid_config("inertia timeout must be non-zero"));
        }
        if self.step_timeout.is_zero() {
            return Err(Error::invalid_config("step timeout must be non-zero"));
        }
        if self.inertia_timeout > self.overall_timeout {
            return Err(Error::invalid_config(format!(
                "inertia timeout {:?} exceeds overall timeout {:?}",
                self.inertia_timeout, self.overall_timeout
            )));
        }
        if self.step_timeout > self.overall_timeout {
            return Err(Error::invalid_config(format!(
                "step timeout {:?} exceeds overall timeout {:?}",
                self.step_timeout, self.overall_timeout
            )));
        }
        Ok(())
    }
}
