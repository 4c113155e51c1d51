//! Session state machines.
//!
//! A session is one `pair` or `read` call against one device. It walks
//!
//! ```text
//! Idle → Connecting → DiscoveringServices → DiscoveringCharacteristics
//!      → Subscribing → Collecting → Terminating → Completed | Failed | Cancelled
//! ```
//!
//! Every suspension point races the transport call against the overall
//! deadline, the cancellation token and the connection stream. Whatever
//! ends the session, [`Session::finish`] is the single place that releases
//! the connection; if the session future is dropped instead, the
//! [`ConnectionGuard`] does it.
//!
//! Three protocols are built on this plumbing:
//!
//! - [`RacpSession`]: subscribe, write `[0x01, 0x01]` to the RACP, collect
//!   until the first RACP response.
//! - [`PassiveSession`]: subscribe and collect until the inertia timer fires.
//! - [`FramedSession`]: sequential CRC-framed request/response exchanges.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use vitalink_types::CharacteristicMap;

use crate::error::{Error, Result};
use crate::events::SessionEvent;
use crate::parsers::RecordParser;
use crate::transport::{
    Characteristic, ConnectionStream, DeviceId, GattTransport, NotificationStream,
    PeripheralHandle,
};

mod config;
mod framed;
mod guard;
mod passive;
mod racp;

pub use config::{
    DEFAULT_INERTIA_TIMEOUT, DEFAULT_OVERALL_TIMEOUT, DEFAULT_STEP_TIMEOUT, SessionConfig,
};
pub use framed::{FramedProtocol, FramedSession};
pub use guard::ConnectionGuard;
pub use passive::PassiveSession;
pub use racp::RacpSession;

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    DiscoveringServices,
    DiscoveringCharacteristics,
    Subscribing,
    /// Waiting for records and for the termination signal.
    Collecting,
    /// Releasing the connection.
    Terminating,
    Completed,
    Failed,
    Cancelled,
}

impl SessionState {
    /// Whether the session has ended.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Completed | SessionState::Failed | SessionState::Cancelled
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Connecting => "connecting",
            SessionState::DiscoveringServices => "discovering services",
            SessionState::DiscoveringCharacteristics => "discovering characteristics",
            SessionState::Subscribing => "subscribing",
            SessionState::Collecting => "collecting",
            SessionState::Terminating => "terminating",
            SessionState::Completed => "completed",
            SessionState::Failed => "failed",
            SessionState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// What interrupted a suspension point.
#[derive(Debug)]
pub(crate) enum Interrupt {
    Cancelled,
    Deadline,
    /// The connection stream reported an error.
    LinkError(Error),
    /// The connection stream ended.
    LinkClosed,
}

impl Interrupt {
    pub(crate) fn into_error(self, operation: &str, duration: Duration) -> Error {
        match self {
            Interrupt::Cancelled => Error::Cancelled,
            Interrupt::Deadline => Error::timeout(operation, duration),
            Interrupt::LinkError(e) => e,
            Interrupt::LinkClosed => Error::ConnectionLost,
        }
    }
}

/// Anything a session can return, for completion logging.
pub(crate) trait Outcome {
    fn sample_count(&self) -> usize;
}

impl Outcome for () {
    fn sample_count(&self) -> usize {
        0
    }
}

impl<S> Outcome for Vec<S> {
    fn sample_count(&self) -> usize {
        self.len()
    }
}

/// Characteristics found during discovery.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Discovered {
    pub measurement: Characteristic,
    pub control: Option<Characteristic>,
}

impl Discovered {
    pub(crate) fn all(&self) -> Vec<Characteristic> {
        let mut all = vec![self.measurement];
        all.extend(self.control);
        all
    }
}

async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// One in-flight session: state, deadline, connection and cleanup.
pub(crate) struct Session {
    transport: Arc<dyn GattTransport>,
    device: DeviceId,
    config: SessionConfig,
    state: SessionState,
    deadline: Instant,
    connection: Option<ConnectionStream>,
    guard: Option<ConnectionGuard>,
}

impl Session {
    /// Start the clock for a new session.
    pub(crate) fn start(
        transport: Arc<dyn GattTransport>,
        device: DeviceId,
        config: SessionConfig,
    ) -> Self {
        if let Some(metrics) = &config.metrics {
            metrics.record_started();
        }
        let deadline = Instant::now() + config.overall_timeout;
        Self {
            transport,
            device,
            config,
            state: SessionState::Idle,
            deadline,
            connection: None,
            guard: None,
        }
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn transport(&self) -> Arc<dyn GattTransport> {
        Arc::clone(&self.transport)
    }

    pub(crate) fn transition(&mut self, to: SessionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(device = %self.device, "Session {} -> {}", from, to);
        self.state = to;
        if let Some(events) = &self.config.events {
            events.send(SessionEvent::StateChanged {
                device: self.device.clone(),
                from,
                to,
            });
        }
    }

    /// Resolves when the session must stop waiting: cancellation, the
    /// overall deadline, or the end of the connection.
    pub(crate) async fn interrupted(&mut self) -> Interrupt {
        let cancel = self.config.cancel.clone();
        let deadline = self.deadline;
        let connection = &mut self.connection;
        tokio::select! {
            biased;
            _ = cancelled(cancel.as_ref()) => Interrupt::Cancelled,
            interrupt = async {
                let Some(stream) = connection.as_mut() else {
                    return std::future::pending().await;
                };
                loop {
                    match stream.next().await {
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Interrupt::LinkError(e),
                        None => return Interrupt::LinkClosed,
                    }
                }
            } => interrupt,
            _ = sleep_until(deadline) => Interrupt::Deadline,
        }
    }

    /// Run one transport operation under the session's bounds.
    pub(crate) async fn step<T, F>(&mut self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let overall = self.config.overall_timeout;
        tokio::pin!(fut);
        tokio::select! {
            biased;
            interrupt = self.interrupted() => Err(interrupt.into_error(operation, overall)),
            result = &mut fut => result,
        }
    }

    /// Wait for the adapter, connect, and arm the connection guard.
    pub(crate) async fn connect(&mut self) -> Result<PeripheralHandle> {
        self.transition(SessionState::Connecting);
        let transport = self.transport();
        self.step("wait for adapter", transport.wait_until_powered_on())
            .await?;

        let device = self.device.clone();
        let mut stream = self.step("connect", transport.connect(&device)).await?;
        // The link may already be up before its first event is observed.
        self.guard = Some(ConnectionGuard::new(
            Arc::clone(&transport),
            PeripheralHandle::new(device.clone()),
        ));
        let first = self
            .step("connect", async {
                stream.next().await.unwrap_or(Err(Error::ConnectionLost))
            })
            .await?;

        debug!(device = %first.id, "Connected");
        self.connection = Some(stream);
        Ok(first)
    }

    /// Find the service and every characteristic in `map`.
    pub(crate) async fn discover(
        &mut self,
        peripheral: &PeripheralHandle,
        map: &CharacteristicMap,
    ) -> Result<Discovered> {
        let transport = self.transport();
        let wanted = map.characteristics();

        self.transition(SessionState::DiscoveringServices);
        let services = self
            .step(
                "discover services",
                transport.discover_services(peripheral, &[map.service]),
            )
            .await?;
        let Some(service) = services.into_iter().find(|s| s.uuid == map.service) else {
            return Err(Error::missing_characteristics(map.service, wanted));
        };

        self.transition(SessionState::DiscoveringCharacteristics);
        let found = self
            .step(
                "discover characteristics",
                transport.discover_characteristics(peripheral, &service, &wanted),
            )
            .await?;

        let lookup = |id: Uuid| found.iter().find(|c| c.uuid == id).copied();
        let missing: Vec<_> = wanted.iter().copied().filter(|id| lookup(*id).is_none()).collect();
        if !missing.is_empty() {
            return Err(Error::missing_characteristics(map.service, missing));
        }

        match (lookup(map.measurement), map.control.map(lookup)) {
            (Some(measurement), None) => Ok(Discovered {
                measurement,
                control: None,
            }),
            (Some(measurement), Some(Some(control))) => Ok(Discovered {
                measurement,
                control: Some(control),
            }),
            _ => Err(Error::missing_characteristics(map.service, wanted)),
        }
    }

    /// Register a listener; notifications are buffered from here on.
    pub(crate) async fn listen(
        &mut self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
    ) -> Result<NotificationStream> {
        let transport = self.transport();
        self.step(
            "listen for updates",
            transport.listen_for_updates(peripheral, characteristic),
        )
        .await
    }

    /// Enable notifications on every characteristic; all must succeed.
    pub(crate) async fn enable_notifications(
        &mut self,
        peripheral: &PeripheralHandle,
        characteristics: &[Characteristic],
    ) -> Result<()> {
        let transport = self.transport();
        for characteristic in characteristics {
            self.step(
                "enable notifications",
                transport.set_notify(peripheral, characteristic, true),
            )
            .await?;
        }
        Ok(())
    }

    pub(crate) async fn write(
        &mut self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<()> {
        let transport = self.transport();
        self.step(
            "write value",
            transport.write_value(peripheral, characteristic, value),
        )
        .await
    }

    /// Parse one notification into `samples`. Returns whether it parsed.
    pub(crate) fn accept<S>(
        &self,
        characteristic: &Characteristic,
        bytes: &[u8],
        parser: RecordParser<S>,
        samples: &mut Vec<S>,
    ) -> bool {
        trace!(characteristic = %characteristic.uuid, "Notification {:02X?}", bytes);
        let metrics = self.config.metrics.as_deref();
        if let Some(metrics) = metrics {
            metrics.record_notification();
        }

        match parser(bytes) {
            Some(sample) => {
                samples.push(sample);
                if let Some(metrics) = metrics {
                    metrics.record_sample();
                }
                true
            }
            None => {
                warn!(
                    device = %self.device,
                    characteristic = %characteristic.uuid,
                    "Dropping malformed record ({} bytes)",
                    bytes.len()
                );
                if let Some(metrics) = metrics {
                    metrics.record_dropped();
                }
                if let Some(events) = &self.config.events {
                    events.send(SessionEvent::RecordDropped {
                        device: self.device.clone(),
                        characteristic: characteristic.uuid.to_string(),
                        length: bytes.len(),
                    });
                }
                false
            }
        }
    }

    /// The single termination point: release the connection once, record
    /// the outcome, and hand the result back.
    pub(crate) async fn finish<T: Outcome>(mut self, result: Result<T>) -> Result<T> {
        self.transition(SessionState::Terminating);
        if let Some(mut guard) = self.guard.take() {
            guard.release().await;
        }
        self.connection = None;

        let metrics = self.config.metrics.clone();
        match &result {
            Ok(outcome) => {
                let samples = outcome.sample_count();
                info!(device = %self.device, "Session completed with {} samples", samples);
                self.transition(SessionState::Completed);
                if let Some(metrics) = &metrics {
                    metrics.record_completed();
                }
                self.emit(SessionEvent::Completed {
                    device: self.device.clone(),
                    samples,
                });
            }
            Err(e) => {
                if matches!(e, Error::Cancelled) {
                    info!(device = %self.device, "Session cancelled");
                    self.transition(SessionState::Cancelled);
                } else {
                    warn!(device = %self.device, "Session failed: {}", e);
                    self.transition(SessionState::Failed);
                }
                if let Some(metrics) = &metrics {
                    metrics.record_failed(e);
                }
                self.emit(SessionEvent::Failed {
                    device: self.device.clone(),
                    error: e.to_string(),
                });
            }
        }
        result
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.config.events {
            events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockTransport, Operation};
    use vitalink_types::{DeviceKind, ble};

    fn session(mock: &Arc<MockTransport>, config: SessionConfig) -> Session {
        Session::start(mock.clone(), DeviceId::new("meter"), config)
    }

    #[test]
    fn test_state_display_and_terminal() {
        assert_eq!(SessionState::DiscoveringServices.to_string(), "discovering services");
        assert!(SessionState::Completed.is_terminal());
        assert!(SessionState::Cancelled.is_terminal());
        assert!(!SessionState::Collecting.is_terminal());
    }

    #[tokio::test]
    async fn test_discover_reports_missing_characteristics() {
        let mock = Arc::new(
            MockTransport::new()
                .with_service(ble::GLUCOSE_SERVICE, &[ble::GLUCOSE_MEASUREMENT]),
        );
        let mut session = session(&mock, SessionConfig::default());
        let peripheral = session.connect().await.unwrap();

        let err = session
            .discover(&peripheral, &DeviceKind::Glucose.characteristics())
            .await
            .unwrap_err();
        match &err {
            Error::MissingCharacteristics { service, missing } => {
                assert_eq!(*service, ble::GLUCOSE_SERVICE);
                assert_eq!(missing, &vec![ble::RECORD_ACCESS_CONTROL_POINT]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let result: Result<()> = session.finish(Err(err)).await;
        assert!(result.is_err());
        assert_eq!(mock.disconnect_count(), 1);
    }

    #[tokio::test]
    async fn test_discover_missing_service() {
        let mock = Arc::new(MockTransport::new());
        let mut session = session(&mock, SessionConfig::default());
        let peripheral = session.connect().await.unwrap();

        let err = session
            .discover(&peripheral, &DeviceKind::BloodPressurePassive.characteristics())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Missing required characteristics"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_times_out_at_overall_deadline() {
        let mock = Arc::new(MockTransport::new());
        let config = SessionConfig::default().overall_timeout(Duration::from_secs(5));
        let mut session = session(&mock, config);

        let start = Instant::now();
        let result: Result<()> = session
            .step("stall", std::future::pending::<Result<()>>())
            .await;

        assert!(matches!(result, Err(Error::Timeout { .. })));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_observes_cancellation() {
        let mock = Arc::new(MockTransport::new());
        let token = CancellationToken::new();
        let config = SessionConfig::default().cancel_token(token.clone());
        let mut session = session(&mock, config);

        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let result: Result<()> = session
            .step("stall", std::future::pending::<Result<()>>())
            .await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[tokio::test]
    async fn test_step_observes_connection_loss() {
        let mock = Arc::new(MockTransport::new());
        let mut session = session(&mock, SessionConfig::default());
        session.connect().await.unwrap();

        mock.drop_connection();
        let result: Result<()> = session
            .step("stall", std::future::pending::<Result<()>>())
            .await;
        assert!(matches!(result, Err(Error::ConnectionLost)));
    }

    #[tokio::test]
    async fn test_connect_failure_does_not_disconnect() {
        let mock = Arc::new(MockTransport::new());
        mock.fail_on(Operation::Connect, "out of range");
        let mut session = session(&mock, SessionConfig::default());

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));

        let result: Result<()> = session.finish(Err(err)).await;
        assert!(result.is_err());
        assert_eq!(mock.disconnect_count(), 0);
    }
}
