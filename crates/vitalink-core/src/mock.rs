//! In-memory transport and peripheral simulator for testing.
//!
//! [`MockTransport`] implements [`GattTransport`] without any Bluetooth
//! hardware. A test describes the peripheral up front: which services and
//! characteristics it exposes, and which notifications it pushes when the
//! host enables notifications on a characteristic or writes to one.
//!
//! # Features
//!
//! - **Scripted notifications**: each [`ScriptedNotification`] carries a
//!   delay measured from its trigger, so paused-time tests can place
//!   records at exact virtual instants.
//! - **Write responders**: a closure answers each write, which is how the
//!   framed meter simulators ([`MockTransport::verio_meter`],
//!   [`MockTransport::verio_iq_meter`]) work.
//! - **Failure injection**: any transport operation can be made to fail.
//! - **Back-pressure**: [`MockTransport::set_busy`] makes the next
//!   deliveries fail; the simulator retries them in a bounded loop.
//! - **Counters**: connects, disconnects and writes, plus a write log.
//!
//! Transport operations complete without consuming time. Notifications
//! pushed for an earlier connection are discarded once the host
//! disconnects or connects again.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use vitalink_core::{DeviceId, RacpSession, parse_glucose_measurement};
//! use vitalink_core::mock::{MockTransport, ScriptedNotification};
//! use vitalink_types::{DeviceKind, ble};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = Arc::new(MockTransport::for_kind(DeviceKind::Glucose).on_write(
//!         ble::RECORD_ACCESS_CONTROL_POINT,
//!         vec![ScriptedNotification::new(
//!             ble::RECORD_ACCESS_CONTROL_POINT,
//!             vec![0x06, 0x00, 0x01, 0x06],
//!         )],
//!     ));
//!     let session = RacpSession::new(
//!         mock.clone(),
//!         DeviceKind::Glucose.characteristics(),
//!         parse_glucose_measurement,
//!     );
//!
//!     let samples = session.read(&DeviceId::new("meter")).await.unwrap();
//!     assert!(samples.is_empty());
//!     assert_eq!(mock.disconnect_count(), 1);
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::channel::mpsc::{UnboundedSender, unbounded};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, warn};
use uuid::Uuid;
use vitalink_types::{DeviceKind, ble, frame};

use crate::error::{Error, Result};
use crate::retry::RetryConfig;
use crate::session::FramedProtocol;
use crate::transport::{
    Characteristic, ConnectionStream, DeviceId, GattTransport, NotificationStream,
    PeripheralHandle, Service,
};

/// Transport operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    WaitPowered,
    Connect,
    DiscoverServices,
    DiscoverCharacteristics,
    SetNotify,
    Write,
    Listen,
    Disconnect,
}

impl Operation {
    /// Name used in [`Error::Transport`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::WaitPowered => "wait until powered on",
            Operation::Connect => "connect",
            Operation::DiscoverServices => "discover services",
            Operation::DiscoverCharacteristics => "discover characteristics",
            Operation::SetNotify => "set notify",
            Operation::Write => "write value",
            Operation::Listen => "listen for updates",
            Operation::Disconnect => "disconnect",
        }
    }
}

/// One value the simulated peripheral pushes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedNotification {
    pub characteristic: Uuid,
    /// Delay from the trigger, not from the previous notification.
    pub delay: Duration,
    pub value: Vec<u8>,
}

impl ScriptedNotification {
    /// A notification sent as soon as its trigger fires.
    pub fn new(characteristic: Uuid, value: impl Into<Vec<u8>>) -> Self {
        Self {
            characteristic,
            delay: Duration::ZERO,
            value: value.into(),
        }
    }

    /// Send this notification `delay` after the trigger.
    #[must_use]
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// What makes a script play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// The host enabled notifications on the characteristic.
    NotifyEnabled(Uuid),
    /// The host wrote to the characteristic.
    Write(Uuid),
}

/// Answers a write with the notifications the peripheral sends back.
pub type Responder = Arc<dyn Fn(&[u8]) -> Vec<ScriptedNotification> + Send + Sync>;

struct Listener {
    characteristic: Uuid,
    sender: UnboundedSender<Vec<u8>>,
}

#[derive(Default)]
struct State {
    services: Vec<(Uuid, Vec<Uuid>)>,
    failures: HashMap<Operation, String>,
    scripts: Vec<(Trigger, Vec<ScriptedNotification>)>,
    responders: HashMap<Uuid, Responder>,
    listeners: Vec<Listener>,
    connection: Option<UnboundedSender<Result<PeripheralHandle>>>,
    writes: Vec<(Uuid, Vec<u8>)>,
    /// Bumped on every connect and link teardown.
    epoch: u64,
}

impl State {
    fn check(&self, operation: Operation) -> Result<()> {
        match self.failures.get(&operation) {
            Some(message) => Err(Error::transport(operation.as_str(), message.clone())),
            None => Ok(()),
        }
    }

    fn tear_down_link(&mut self) {
        self.connection = None;
        self.listeners.clear();
        self.epoch += 1;
    }
}

/// Shared between the transport and its delivery tasks.
struct Shared {
    state: Mutex<State>,
    busy: AtomicU32,
    retry: RetryConfig,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Play one script, stopping early if the link it belongs to is gone.
    async fn play(&self, epoch: u64, script: Vec<ScriptedNotification>) {
        let start = Instant::now();
        for notification in script {
            if !notification.delay.is_zero() {
                sleep_until(start + notification.delay).await;
            }
            if !self.deliver(epoch, &notification).await {
                return;
            }
        }
    }

    /// Push one notification, retrying while the link is busy. Returns
    /// `false` once the link is stale.
    async fn deliver(&self, epoch: u64, notification: &ScriptedNotification) -> bool {
        let mut attempt = 0;
        loop {
            let busy = self
                .busy
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if !busy {
                return self.send(epoch, notification);
            }
            if attempt >= self.retry.max_retries {
                warn!(
                    characteristic = %notification.characteristic,
                    "Link busy after {} attempts, dropping notification", attempt + 1
                );
                return true;
            }
            let delay = self.retry.delay_for_attempt(attempt);
            debug!("Link busy, retrying notification in {:?}", delay);
            attempt += 1;
            sleep(delay).await;
        }
    }

    fn send(&self, epoch: u64, notification: &ScriptedNotification) -> bool {
        let mut state = self.state();
        if state.epoch != epoch {
            return false;
        }
        state.listeners.retain(|listener| {
            listener.characteristic != notification.characteristic
                || listener
                    .sender
                    .unbounded_send(notification.value.clone())
                    .is_ok()
        });
        true
    }
}

/// A simulated BLE central and peripheral pair.
pub struct MockTransport {
    shared: Arc<Shared>,
    connects: AtomicU32,
    disconnects: AtomicU32,
    writes: AtomicU32,
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("connects", &self.connect_count())
            .field("disconnects", &self.disconnect_count())
            .field("writes", &self.write_count())
            .finish_non_exhaustive()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A peripheral with no services.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State::default()),
                busy: AtomicU32::new(0),
                retry: RetryConfig::quick(),
            }),
            connects: AtomicU32::new(0),
            disconnects: AtomicU32::new(0),
            writes: AtomicU32::new(0),
        }
    }

    /// A peripheral exposing every characteristic `kind` needs.
    pub fn for_kind(kind: DeviceKind) -> Self {
        let map = kind.characteristics();
        Self::new().with_service(map.service, &map.characteristics())
    }

    /// A Verio meter that answers count and record requests from
    /// `records`, each the payload of one record response.
    pub fn verio_meter(records: Vec<Vec<u8>>) -> Self {
        let count = u16::try_from(records.len()).unwrap_or(u16::MAX);
        Self::framed_meter(
            DeviceKind::OneTouchVerio,
            FramedProtocol::VERIO,
            count.to_le_bytes().to_vec(),
            records,
        )
    }

    /// A Verio IQ meter; same as [`MockTransport::verio_meter`] with the IQ
    /// requests and its four-byte record count.
    pub fn verio_iq_meter(records: Vec<Vec<u8>>) -> Self {
        let count = u32::try_from(records.len()).unwrap_or(u32::MAX);
        Self::framed_meter(
            DeviceKind::OneTouchVerioIq,
            FramedProtocol::VERIO_IQ,
            count.to_le_bytes().to_vec(),
            records,
        )
    }

    fn framed_meter(
        kind: DeviceKind,
        framing: FramedProtocol,
        count: Vec<u8>,
        records: Vec<Vec<u8>>,
    ) -> Self {
        let map = kind.characteristics();
        let notify = map.measurement;
        let write = map.control.unwrap_or(map.measurement);
        Self::for_kind(kind).respond_to_writes(write, move |packet| {
            let Some(request) = request_payload(packet) else {
                return Vec::new();
            };
            let mut payload = vec![frame::RESPONSE_OK];
            if request == framing.count_request {
                payload.extend_from_slice(&count);
            } else {
                let record = (0..=u16::MAX)
                    .zip(&records)
                    .find(|(index, _)| (framing.record_request)(*index) == request);
                match record {
                    Some((_, record)) => payload.extend_from_slice(record),
                    None => payload[0] = NOT_FOUND,
                }
            }
            match frame::encode_response(frame::ACK, &payload) {
                Ok(response) => vec![ScriptedNotification::new(notify, response)],
                Err(_) => Vec::new(),
            }
        })
    }

    /// Add a service and its characteristics.
    #[must_use]
    pub fn with_service(self, service: Uuid, characteristics: &[Uuid]) -> Self {
        self.shared
            .state()
            .services
            .push((service, characteristics.to_vec()));
        self
    }

    /// Push `script` whenever notifications are enabled on `characteristic`.
    #[must_use]
    pub fn on_notify(self, characteristic: Uuid, script: Vec<ScriptedNotification>) -> Self {
        self.shared
            .state()
            .scripts
            .push((Trigger::NotifyEnabled(characteristic), script));
        self
    }

    /// Push `script` whenever the host writes to `characteristic`.
    #[must_use]
    pub fn on_write(self, characteristic: Uuid, script: Vec<ScriptedNotification>) -> Self {
        self.shared
            .state()
            .scripts
            .push((Trigger::Write(characteristic), script));
        self
    }

    /// Answer every write to `characteristic` with `responder`.
    #[must_use]
    pub fn respond_to_writes<F>(self, characteristic: Uuid, responder: F) -> Self
    where
        F: Fn(&[u8]) -> Vec<ScriptedNotification> + Send + Sync + 'static,
    {
        self.shared
            .state()
            .responders
            .insert(characteristic, Arc::new(responder));
        self
    }

    /// Make `operation` fail with `message` until cleared.
    pub fn fail_on(&self, operation: Operation, message: &str) {
        self.shared
            .state()
            .failures
            .insert(operation, message.to_string());
    }

    /// Let `operation` succeed again.
    pub fn clear_failure(&self, operation: Operation) {
        self.shared.state().failures.remove(&operation);
    }

    /// Fail the next `deliveries` notification attempts as if the link had
    /// no room. The simulator retries each one with [`RetryConfig::quick`].
    pub fn set_busy(&self, deliveries: u32) {
        self.shared.busy.store(deliveries, Ordering::SeqCst);
    }

    /// Simulate the peripheral dropping the link.
    pub fn drop_connection(&self) {
        self.shared.state().tear_down_link();
    }

    /// Whether a connection is currently open.
    pub fn is_connected(&self) -> bool {
        self.shared.state().connection.is_some()
    }

    /// Number of `connect` calls that succeeded.
    pub fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::Relaxed)
    }

    /// Number of `disconnect` calls, including failed ones.
    pub fn disconnect_count(&self) -> u32 {
        self.disconnects.load(Ordering::Relaxed)
    }

    /// Number of `write_value` calls that succeeded.
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Every successful write, in order.
    pub fn writes(&self) -> Vec<(Uuid, Vec<u8>)> {
        self.shared.state().writes.clone()
    }

    fn fire(&self, trigger: Trigger, written: Option<&[u8]>) {
        let (epoch, scripts) = {
            let state = self.shared.state();
            let mut scripts: Vec<_> = state
                .scripts
                .iter()
                .filter(|(t, _)| *t == trigger)
                .map(|(_, script)| script.clone())
                .collect();
            if let (Trigger::Write(characteristic), Some(value)) = (trigger, written)
                && let Some(responder) = state.responders.get(&characteristic)
            {
                scripts.push(responder(value));
            }
            (state.epoch, scripts)
        };

        for script in scripts.into_iter().filter(|s| !s.is_empty()) {
            let shared = Arc::clone(&self.shared);
            tokio::spawn(async move { shared.play(epoch, script).await });
        }
    }
}

/// Response code the simulated meter uses for requests it cannot serve.
const NOT_FOUND: u8 = 0x15;

/// Extract the payload of a request packet without checking its CRC.
fn request_payload(packet: &[u8]) -> Option<&[u8]> {
    if packet.len() < frame::FRAME_OVERHEAD + 1 || packet[1] != frame::STX {
        return None;
    }
    packet.get(5..packet.len() - 3)
}

#[async_trait]
impl GattTransport for MockTransport {
    async fn wait_until_powered_on(&self) -> Result<()> {
        self.shared.state().check(Operation::WaitPowered)
    }

    async fn connect(&self, device: &DeviceId) -> Result<ConnectionStream> {
        let mut state = self.shared.state();
        state.check(Operation::Connect)?;

        let (sender, receiver) = unbounded();
        let _ = sender.unbounded_send(Ok(PeripheralHandle::new(device.clone())));
        state.tear_down_link();
        state.connection = Some(sender);
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(receiver.boxed())
    }

    async fn discover_services(
        &self,
        _peripheral: &PeripheralHandle,
        services: &[Uuid],
    ) -> Result<Vec<Service>> {
        let state = self.shared.state();
        state.check(Operation::DiscoverServices)?;
        Ok(state
            .services
            .iter()
            .filter(|(uuid, _)| services.contains(uuid))
            .map(|(uuid, _)| Service { uuid: *uuid })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        _peripheral: &PeripheralHandle,
        service: &Service,
        characteristics: &[Uuid],
    ) -> Result<Vec<Characteristic>> {
        let state = self.shared.state();
        state.check(Operation::DiscoverCharacteristics)?;
        Ok(state
            .services
            .iter()
            .filter(|(uuid, _)| *uuid == service.uuid)
            .flat_map(|(_, chars)| chars.iter())
            .filter(|uuid| characteristics.contains(uuid))
            .map(|uuid| Characteristic {
                uuid: *uuid,
                service: service.uuid,
            })
            .collect())
    }

    async fn set_notify(
        &self,
        _peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        enabled: bool,
    ) -> Result<()> {
        self.shared.state().check(Operation::SetNotify)?;
        if enabled {
            self.fire(Trigger::NotifyEnabled(characteristic.uuid), None);
        }
        Ok(())
    }

    async fn write_value(
        &self,
        _peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<()> {
        {
            let mut state = self.shared.state();
            state.check(Operation::Write)?;
            state.writes.push((characteristic.uuid, value.to_vec()));
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.fire(Trigger::Write(characteristic.uuid), Some(value));
        Ok(())
    }

    async fn listen_for_updates(
        &self,
        _peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
    ) -> Result<NotificationStream> {
        let mut state = self.shared.state();
        state.check(Operation::Listen)?;
        let (sender, receiver) = unbounded();
        state.listeners.push(Listener {
            characteristic: characteristic.uuid,
            sender,
        });
        Ok(receiver.boxed())
    }

    async fn disconnect(&self, _peripheral: &PeripheralHandle) -> Result<()> {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
        let mut state = self.shared.state();
        state.check(Operation::Disconnect)?;
        state.tear_down_link();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::verio::{IQ_READ_RECORD_COUNT, READ_RECORD_COUNT, iq_read_record_request};
    use futures::FutureExt;

    fn peripheral() -> PeripheralHandle {
        PeripheralHandle::new(DeviceId::new("meter"))
    }

    fn characteristic(uuid: Uuid, service: Uuid) -> Characteristic {
        Characteristic { uuid, service }
    }

    #[tokio::test]
    async fn test_connect_yields_handle() {
        let mock = MockTransport::new();
        let mut stream = mock.connect(&DeviceId::new("meter")).await.unwrap();

        let handle = stream.next().await.unwrap().unwrap();
        assert_eq!(handle.id.as_str(), "meter");
        assert!(mock.is_connected());
        assert_eq!(mock.connect_count(), 1);

        mock.drop_connection();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_discovery_filters_requested() {
        let mock = MockTransport::for_kind(DeviceKind::Glucose);
        let services = mock
            .discover_services(&peripheral(), &[ble::GLUCOSE_SERVICE, ble::VERIO_SERVICE])
            .await
            .unwrap();
        assert_eq!(services, vec![Service { uuid: ble::GLUCOSE_SERVICE }]);

        let chars = mock
            .discover_characteristics(&peripheral(), &services[0], &[ble::GLUCOSE_MEASUREMENT])
            .await
            .unwrap();
        assert_eq!(chars.len(), 1);
        assert_eq!(chars[0].uuid, ble::GLUCOSE_MEASUREMENT);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mock = MockTransport::new();
        mock.fail_on(Operation::WaitPowered, "adapter off");

        let err = mock.wait_until_powered_on().await.unwrap_err();
        assert_eq!(err.to_string(), "Bluetooth error during wait until powered on: adapter off");

        mock.clear_failure(Operation::WaitPowered);
        assert!(mock.wait_until_powered_on().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_notify_script_respects_delays() {
        let measurement = characteristic(ble::BLOOD_PRESSURE_MEASUREMENT, ble::BLOOD_PRESSURE_SERVICE);
        let mock = MockTransport::for_kind(DeviceKind::BloodPressurePassive).on_notify(
            measurement.uuid,
            vec![
                ScriptedNotification::new(measurement.uuid, vec![1]),
                ScriptedNotification::new(measurement.uuid, vec![2]).after(Duration::from_secs(3)),
            ],
        );
        mock.connect(&DeviceId::new("cuff")).await.unwrap();
        let mut updates = mock.listen_for_updates(&peripheral(), &measurement).await.unwrap();

        let start = Instant::now();
        mock.set_notify(&peripheral(), &measurement, true).await.unwrap();
        assert_eq!(updates.next().await, Some(vec![1]));
        assert_eq!(updates.next().await, Some(vec![2]));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_discards_pending_notifications() {
        let measurement = characteristic(ble::BLOOD_PRESSURE_MEASUREMENT, ble::BLOOD_PRESSURE_SERVICE);
        let mock = MockTransport::for_kind(DeviceKind::BloodPressurePassive).on_notify(
            measurement.uuid,
            vec![ScriptedNotification::new(measurement.uuid, vec![1]).after(Duration::from_secs(1))],
        );
        mock.connect(&DeviceId::new("cuff")).await.unwrap();
        let mut updates = mock.listen_for_updates(&peripheral(), &measurement).await.unwrap();
        mock.set_notify(&peripheral(), &measurement, true).await.unwrap();

        mock.disconnect(&peripheral()).await.unwrap();
        assert!(updates.next().await.is_none());
        assert_eq!(mock.disconnect_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_link_retries_delivery() {
        let measurement = characteristic(ble::GLUCOSE_MEASUREMENT, ble::GLUCOSE_SERVICE);
        let mock = MockTransport::for_kind(DeviceKind::Glucose).on_notify(
            measurement.uuid,
            vec![ScriptedNotification::new(measurement.uuid, vec![7])],
        );
        mock.set_busy(2);
        mock.connect(&DeviceId::new("meter")).await.unwrap();
        let mut updates = mock.listen_for_updates(&peripheral(), &measurement).await.unwrap();

        let start = Instant::now();
        mock.set_notify(&peripheral(), &measurement, true).await.unwrap();
        assert_eq!(updates.next().await, Some(vec![7]));
        // Quick retry delays: 20 ms then 40 ms.
        assert_eq!(start.elapsed(), Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_verio_meter_answers_count() {
        let write = characteristic(ble::VERIO_WRITE, ble::VERIO_SERVICE);
        let notify = characteristic(ble::VERIO_NOTIFY, ble::VERIO_SERVICE);
        let mock = MockTransport::verio_meter(vec![vec![0; 9], vec![0; 9]]);
        mock.connect(&DeviceId::new("verio")).await.unwrap();
        let mut responses = mock.listen_for_updates(&peripheral(), &notify).await.unwrap();

        let request = frame::encode_request(&READ_RECORD_COUNT).unwrap();
        mock.write_value(&peripheral(), &write, &request).await.unwrap();

        let response = responses.next().await.unwrap();
        let payload = frame::decode_response(&response).unwrap();
        assert_eq!(payload, &[frame::RESPONSE_OK, 2, 0]);
        assert_eq!(mock.write_count(), 1);
        assert_eq!(mock.writes()[0], (ble::VERIO_WRITE, request));
    }

    #[tokio::test]
    async fn test_verio_meter_ignores_ack() {
        let write = characteristic(ble::VERIO_WRITE, ble::VERIO_SERVICE);
        let notify = characteristic(ble::VERIO_NOTIFY, ble::VERIO_SERVICE);
        let mock = MockTransport::verio_meter(Vec::new());
        mock.connect(&DeviceId::new("verio")).await.unwrap();
        let mut responses = mock.listen_for_updates(&peripheral(), &notify).await.unwrap();

        mock.write_value(&peripheral(), &write, &frame::ack_packet()).await.unwrap();
        tokio::task::yield_now().await;
        assert!(responses.next().now_or_never().is_none());
    }

    #[tokio::test]
    async fn test_verio_iq_meter_answers_its_own_requests() {
        let write = characteristic(ble::VERIO_WRITE, ble::VERIO_SERVICE);
        let notify = characteristic(ble::VERIO_NOTIFY, ble::VERIO_SERVICE);
        let mock = MockTransport::verio_iq_meter(vec![vec![0xAA; 10], vec![0xBB; 10]]);
        mock.connect(&DeviceId::new("verio-iq")).await.unwrap();
        let mut responses = mock.listen_for_updates(&peripheral(), &notify).await.unwrap();

        let count = frame::encode_request(&IQ_READ_RECORD_COUNT).unwrap();
        mock.write_value(&peripheral(), &write, &count).await.unwrap();
        let response = responses.next().await.unwrap();
        assert_eq!(
            frame::decode_response(&response).unwrap(),
            &[frame::RESPONSE_OK, 2, 0, 0, 0]
        );

        let record = frame::encode_request(&iq_read_record_request(1)).unwrap();
        mock.write_value(&peripheral(), &write, &record).await.unwrap();
        let response = responses.next().await.unwrap();
        let payload = frame::decode_response(&response).unwrap();
        assert_eq!(payload[0], frame::RESPONSE_OK);
        assert_eq!(&payload[1..], &[0xBB; 10]);

        // The original Verio count request is not part of the IQ protocol.
        let foreign = frame::encode_request(&READ_RECORD_COUNT).unwrap();
        mock.write_value(&peripheral(), &write, &foreign).await.unwrap();
        let response = responses.next().await.unwrap();
        assert_eq!(frame::decode_response(&response).unwrap(), &[NOT_FOUND]);
    }
}
