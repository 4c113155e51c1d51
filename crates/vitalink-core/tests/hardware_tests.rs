//! Hardware integration tests for vitalink-core
//!
//! These tests require a powered Bluetooth adapter and a real device, and
//! should be run with:
//! ```text
//! cargo test --package vitalink-core --test hardware_tests -- --ignored --nocapture
//! ```
//!
//! Configure devices via environment variables:
//! - `VITALINK_GLUCOSE_DEVICE`: glucose meter with RACP
//! - `VITALINK_BP_DEVICE`: blood-pressure monitor with RACP
//! - `VITALINK_BP_PASSIVE_DEVICE`: blood-pressure monitor without RACP
//! - `VITALINK_VERIO_DEVICE`: OneTouch Verio meter
//! - `VITALINK_VERIO_IQ_DEVICE`: OneTouch Verio IQ meter

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use vitalink_core::{BtleplugCentral, DeviceId, ReaderRegistry, SessionConfig};
use vitalink_types::DeviceKind;

/// Upper bound on a whole test, above the session's own deadline.
const TEST_TIMEOUT: Duration = Duration::from_secs(150);

fn device_for(kind: DeviceKind) -> Option<DeviceId> {
    let key = match kind {
        DeviceKind::Glucose => "VITALINK_GLUCOSE_DEVICE",
        DeviceKind::BloodPressure => "VITALINK_BP_DEVICE",
        DeviceKind::BloodPressurePassive => "VITALINK_BP_PASSIVE_DEVICE",
        DeviceKind::OneTouchVerio => "VITALINK_VERIO_DEVICE",
        DeviceKind::OneTouchVerioIq => "VITALINK_VERIO_IQ_DEVICE",
        _ => return None,
    };
    env::var(key).ok().map(DeviceId::new)
}

async fn read_kind(kind: DeviceKind) {
    let Some(device) = device_for(kind) else {
        println!("No device configured for {}, skipping", kind);
        return;
    };

    let central = Arc::new(BtleplugCentral::new().await.expect("no Bluetooth adapter"));
    let registry = ReaderRegistry::with_defaults(central, SessionConfig::patient());

    let result = timeout(TEST_TIMEOUT, registry.read(kind, &device)).await;
    match result {
        Ok(Ok(measurements)) => {
            println!("Read {} measurements from {}", measurements.len(), device);
            for m in measurements.iter().take(5) {
                println!("  {:?}", m);
            }
        }
        Ok(Err(e)) => panic!("Read failed: {}", e),
        Err(_) => panic!("Read did not finish within {:?}", TEST_TIMEOUT),
    }
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_glucose_meter() {
    read_kind(DeviceKind::Glucose).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_blood_pressure_monitor() {
    read_kind(DeviceKind::BloodPressure).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_passive_blood_pressure_monitor() {
    read_kind(DeviceKind::BloodPressurePassive).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_verio_meter() {
    read_kind(DeviceKind::OneTouchVerio).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_read_verio_iq_meter() {
    read_kind(DeviceKind::OneTouchVerioIq).await;
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn test_pair_glucose_meter() {
    let Some(device) = device_for(DeviceKind::Glucose) else {
        println!("No glucose meter configured, skipping");
        return;
    };
    let central = Arc::new(BtleplugCentral::new().await.expect("no Bluetooth adapter"));
    let registry = ReaderRegistry::with_defaults(central, SessionConfig::default());

    registry
        .pair(DeviceKind::Glucose, &device)
        .await
        .expect("pairing failed");
}
