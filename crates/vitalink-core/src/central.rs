//! [`GattTransport`] binding for desktop hosts, backed by btleplug.
//!
//! The central addresses peripherals the host already knows about, by
//! platform peripheral id, Bluetooth address or advertised name. If the
//! adapter has not seen the device yet, a few short scans are run to find
//! it. Discovering unknown devices is left to the application.

use std::collections::HashMap;
use std::future::ready;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use btleplug::api::{
    Central, CentralEvent, Characteristic as BleCharacteristic, Manager as _, Peripheral as _,
    ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::{StreamExt, stream};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::transport::{
    Characteristic, ConnectionStream, DeviceId, GattTransport, NotificationStream,
    PeripheralHandle, Service,
};

/// Default length of the first scan when a device is not known yet.
pub const DEFAULT_SCAN_DURATION: Duration = Duration::from_secs(3);

const SCAN_ATTEMPTS: u32 = 3;

/// Bluetooth address platforms report when they hide the real one.
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// A btleplug adapter acting as BLE central.
pub struct BtleplugCentral {
    adapter: Adapter,
    scan_duration: Duration,
    connected: Mutex<HashMap<DeviceId, Peripheral>>,
}

impl std::fmt::Debug for BtleplugCentral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleplugCentral")
            .field("scan_duration", &self.scan_duration)
            .finish_non_exhaustive()
    }
}

impl BtleplugCentral {
    /// Use the first Bluetooth adapter on the host.
    ///
    /// # Errors
    ///
    /// [`Error::AdapterUnavailable`] when the host has no adapter.
    pub async fn new() -> Result<Self> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(Error::AdapterUnavailable)?;
        Ok(Self::with_adapter(adapter))
    }

    /// Use a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            scan_duration: DEFAULT_SCAN_DURATION,
            connected: Mutex::new(HashMap::new()),
        }
    }

    /// Set the length of the first scan. Later attempts scan longer.
    #[must_use]
    pub fn scan_duration(mut self, duration: Duration) -> Self {
        self.scan_duration = duration;
        self
    }

    fn connected(&self) -> MutexGuard<'_, HashMap<DeviceId, Peripheral>> {
        self.connected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn peripheral(&self, handle: &PeripheralHandle) -> Result<Peripheral> {
        self.connected()
            .get(&handle.id)
            .cloned()
            .ok_or(Error::ConnectionLost)
    }

    /// Find a peripheral the adapter knows, scanning if needed.
    async fn locate(&self, device: &DeviceId) -> Result<Peripheral> {
        let wanted = device.as_str().to_lowercase();
        if let Some(peripheral) = self.find_known(&wanted).await? {
            debug!("Found {} without scanning", device);
            return Ok(peripheral);
        }

        for attempt in 1..=SCAN_ATTEMPTS {
            let duration = self.scan_duration * attempt;
            info!(
                "Scanning for {} ({}/{}, {:?})",
                device, attempt, SCAN_ATTEMPTS, duration
            );
            self.adapter.start_scan(ScanFilter::default()).await?;
            sleep(duration).await;
            self.adapter.stop_scan().await?;

            if let Some(peripheral) = self.find_known(&wanted).await? {
                info!("Found {} on scan attempt {}", device, attempt);
                return Ok(peripheral);
            }
        }

        warn!("{} not found after {} scans", device, SCAN_ATTEMPTS);
        Err(Error::DeviceNotFound(device.to_string()))
    }

    async fn find_known(&self, wanted: &str) -> Result<Option<Peripheral>> {
        for peripheral in self.adapter.peripherals().await? {
            let Ok(Some(props)) = peripheral.properties().await else {
                continue;
            };
            let address = props.address.to_string().to_lowercase();
            let name = props.local_name.as_deref().map(str::to_lowercase);
            let id = format_peripheral_id(&peripheral.id());
            if matches_identifier(&id, &address, name.as_deref(), wanted) {
                return Ok(Some(peripheral));
            }
        }
        Ok(None)
    }
}

/// Platform peripheral id without the `PeripheralId(..)` wrapper.
fn format_peripheral_id(id: &PeripheralId) -> String {
    format!("{:?}", id)
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_lowercase()
}

/// Whether a peripheral matches a lowercase identifier: by platform id,
/// by address with or without colons, or by part of its name.
fn matches_identifier(
    peripheral_id: &str,
    address: &str,
    name: Option<&str>,
    wanted: &str,
) -> bool {
    if peripheral_id == wanted {
        return true;
    }
    if address != HIDDEN_ADDRESS
        && (address == wanted || address.replace(':', "") == wanted.replace(':', ""))
    {
        return true;
    }
    name.is_some_and(|name| name.contains(wanted))
}

fn find_characteristic(
    peripheral: &Peripheral,
    characteristic: &Characteristic,
) -> Result<BleCharacteristic> {
    peripheral
        .characteristics()
        .into_iter()
        .find(|c| c.uuid == characteristic.uuid && c.service_uuid == characteristic.service)
        .ok_or_else(|| {
            Error::missing_characteristics(characteristic.service, vec![characteristic.uuid])
        })
}

#[async_trait]
impl GattTransport for BtleplugCentral {
    async fn wait_until_powered_on(&self) -> Result<()> {
        // btleplug has no portable power-state query; an adapter that
        // lists peripherals is usable.
        self.adapter
            .peripherals()
            .await
            .map(|_| ())
            .map_err(|e| {
                warn!("Adapter not usable: {}", e);
                Error::AdapterUnavailable
            })
    }

    async fn connect(&self, device: &DeviceId) -> Result<ConnectionStream> {
        let peripheral = self.locate(device).await?;
        let mut events = self.adapter.events().await?;
        peripheral.connect().await?;

        let name = peripheral
            .properties()
            .await
            .ok()
            .flatten()
            .and_then(|p| p.local_name);
        let handle = PeripheralHandle {
            id: device.clone(),
            name,
        };
        self.connected().insert(device.clone(), peripheral.clone());
        info!("Connected to {}", device);

        let peripheral_id = peripheral.id();
        let disconnected = async move {
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(id) = event
                    && id == peripheral_id
                {
                    debug!("Adapter reported disconnect");
                    break;
                }
            }
        };
        let lifecycle = stream::once(ready(Ok(handle))).chain(
            stream::once(disconnected).filter_map(|()| ready(None::<Result<PeripheralHandle>>)),
        );
        Ok(lifecycle.boxed())
    }

    async fn discover_services(
        &self,
        peripheral: &PeripheralHandle,
        services: &[Uuid],
    ) -> Result<Vec<Service>> {
        let device = self.peripheral(peripheral)?;
        device.discover_services().await?;
        Ok(device
            .services()
            .into_iter()
            .filter(|s| services.contains(&s.uuid))
            .map(|s| Service { uuid: s.uuid })
            .collect())
    }

    async fn discover_characteristics(
        &self,
        peripheral: &PeripheralHandle,
        service: &Service,
        characteristics: &[Uuid],
    ) -> Result<Vec<Characteristic>> {
        let device = self.peripheral(peripheral)?;
        Ok(device
            .services()
            .into_iter()
            .filter(|s| s.uuid == service.uuid)
            .flat_map(|s| s.characteristics)
            .filter(|c| characteristics.contains(&c.uuid))
            .map(|c| Characteristic {
                uuid: c.uuid,
                service: c.service_uuid,
            })
            .collect())
    }

    async fn set_notify(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        enabled: bool,
    ) -> Result<()> {
        let device = self.peripheral(peripheral)?;
        let target = find_characteristic(&device, characteristic)?;
        if enabled {
            device.subscribe(&target).await?;
        } else {
            device.unsubscribe(&target).await?;
        }
        Ok(())
    }

    async fn write_value(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
        value: &[u8],
    ) -> Result<()> {
        let device = self.peripheral(peripheral)?;
        let target = find_characteristic(&device, characteristic)?;
        device.write(&target, value, WriteType::WithResponse).await?;
        Ok(())
    }

    async fn listen_for_updates(
        &self,
        peripheral: &PeripheralHandle,
        characteristic: &Characteristic,
    ) -> Result<NotificationStream> {
        let device = self.peripheral(peripheral)?;
        let uuid = characteristic.uuid;
        let notifications = device.notifications().await?;
        Ok(notifications
            .filter_map(move |n| ready((n.uuid == uuid).then_some(n.value)))
            .boxed())
    }

    async fn disconnect(&self, peripheral: &PeripheralHandle) -> Result<()> {
        let removed = self.connected().remove(&peripheral.id);
        let Some(device) = removed else {
            return Ok(());
        };
        device.disconnect().await?;
        info!("Disconnected from {}", peripheral.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_by_address() {
        assert!(matches_identifier("hci0/dev_x", "aa:bb:cc:dd:ee:ff", None, "aa:bb:cc:dd:ee:ff"));
        assert!(matches_identifier("hci0/dev_x", "aa:bb:cc:dd:ee:ff", None, "aabbccddeeff"));
        assert!(!matches_identifier("hci0/dev_x", "aa:bb:cc:dd:ee:ff", None, "11:22:33:44:55:66"));
    }

    #[test]
    fn test_hidden_address_never_matches() {
        assert!(!matches_identifier("abc", HIDDEN_ADDRESS, None, "000000000000"));
    }

    #[test]
    fn test_matches_by_peripheral_id_and_name() {
        let id = "6f0e2b1c-1111-2222-3333-444455556666";
        assert!(matches_identifier(id, HIDDEN_ADDRESS, None, id));
        assert!(matches_identifier(id, HIDDEN_ADDRESS, Some("onetouch verio flex"), "verio"));
        assert!(!matches_identifier(id, HIDDEN_ADDRESS, Some("omron"), "verio"));
    }
}
