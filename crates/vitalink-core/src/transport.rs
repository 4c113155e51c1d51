//! The BLE transport capability consumed by the sessions.
//!
//! Sessions never talk to a Bluetooth stack directly. They drive an
//! `Arc<dyn GattTransport>`, which is implemented by [`crate::BtleplugCentral`]
//! for real hardware and by [`crate::MockTransport`] for tests and simulators.
//!
//! Transports must deliver every notification that arrives after
//! [`GattTransport::listen_for_updates`] returns, even when nobody is polling
//! the stream yet. Sessions register their listeners before enabling
//! notifications or writing a command and rely on that buffering.

use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Identifier a transport uses to address a peripheral.
///
/// For btleplug this is the platform peripheral id (a MAC address on Linux
/// and Windows, a UUID on macOS).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A connected peripheral.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralHandle {
    pub id: DeviceId,
    /// Advertised local name, when the transport knows it.
    pub name: Option<String>,
}

impl PeripheralHandle {
    pub fn new(id: DeviceId) -> Self {
        Self { id, name: None }
    }
}

/// A discovered GATT service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Service {
    pub uuid: Uuid,
}

/// A discovered GATT characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Characteristic {
    pub uuid: Uuid,
    pub service: Uuid,
}

/// Connection lifecycle for one `connect` call.
///
/// Yields one `Ok` when the link is up, then stays open until the link drops.
/// An `Err` item or the end of the stream means the connection is gone.
pub type ConnectionStream = BoxStream<'static, Result<PeripheralHandle>>;

/// Values notified on one characteristic, in arrival order.
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

/// BLE central operations needed to transfer records.
#[async_trait]
pub trait GattTransport: Send + Sync {
    /// Resolve once the adapter is powered on and usable.
    async fn wait_until_powered_on(&self) -> Result<()>;

    /// Connect to a device. See [`ConnectionStream`].
    async fn connect(&self, device: &DeviceId) -> Result<ConnectionStream>;

    /// Discover the services among `services` that the peripheral exposes.
    async fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
        services: &[Uuid],
    ) -> Result<Vec<Service>>;

    /// Discover the characteristics among `characteristics` on `service`.
    async fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &Service,
        characteristics: &[Uuid],
    ) -> Result<Vec<Characteristic>>;

    /// Enable or disable notifications (or indications) on a characteristic.
    async fn set_notify(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        enabled: bool,
    ) -> Result<()>;

    /// Write a value, waiting for the peripheral's acknowledgement.
    async fn write_value(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<()>;

    /// Start buffering notifications on a characteristic.
    ///
    /// Dropping the returned stream releases the listener.
    async fn listen_for_updates(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
    ) -> Result<NotificationStream>;

    /// Disconnect from the peripheral.
    async fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<()>;
}
