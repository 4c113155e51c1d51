//! Async BLE record-transfer engine for personal medical devices.
//!
//! This crate pulls stored measurement records out of glucose meters and
//! blood-pressure monitors over Bluetooth Low Energy. It owns the session
//! state machines, the record parsers and the per-family readers; the
//! Bluetooth stack itself sits behind the [`GattTransport`] trait.
//!
//! # Features
//!
//! - **RACP transfer**: write "report all stored records" and collect until
//!   the Record Access Control Point answers ([`RacpSession`])
//! - **Passive transfer**: collect pushed records until the device goes
//!   quiet ([`PassiveSession`])
//! - **Framed transfer**: CRC-framed request/response exchanges for
//!   OneTouch Verio and Verio IQ meters ([`FramedSession`], [`FramedProtocol`])
//! - **Exactly-once cleanup**: every session that connected disconnects
//!   once, whether it succeeds, fails, times out, is cancelled or is dropped
//! - **Observability**: `tracing` spans, [`SessionMetrics`] counters and a
//!   [`SessionEvent`] broadcast
//! - **Testing**: an in-memory [`MockTransport`] with scripted peripherals
//!
//! # Supported Devices
//!
//! | Kind | Profile | Transfer |
//! |------|---------|----------|
//! | Glucose meter | 0x1808 | RACP |
//! | Blood-pressure monitor | 0x1810 | RACP |
//! | Blood-pressure monitor | 0x1810 | passive |
//! | OneTouch Verio | vendor service | framed |
//! | OneTouch Verio IQ | vendor service | framed |
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use vitalink_core::{BtleplugCentral, DeviceId, ReaderRegistry, SessionConfig};
//! use vitalink_types::DeviceKind;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let central = Arc::new(BtleplugCentral::new().await?);
//!     let registry = ReaderRegistry::with_defaults(central, SessionConfig::default());
//!
//!     let device = DeviceId::new("AA:BB:CC:DD:EE:FF");
//!     for measurement in registry.read(DeviceKind::Glucose, &device).await? {
//!         println!("{:?}", measurement);
//!     }
//!     Ok(())
//! }
//! ```

pub mod central;
pub mod error;
pub mod events;
pub mod metrics;
pub mod mock;
pub mod parsers;
pub mod reader;
pub mod retry;
pub mod session;
pub mod transport;

pub use central::BtleplugCentral;
pub use error::{Error, Result};
pub use events::{EventDispatcher, EventReceiver, EventSender, SessionEvent};
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use mock::MockTransport;
pub use parsers::{
    RecordParser, parse_blood_pressure_measurement, parse_glucose_measurement,
    parse_verio_iq_record, parse_verio_iq_record_count, parse_verio_record,
    parse_verio_record_count,
};
pub use reader::{
    BloodPressureReader, DeviceReader, GlucoseReader, MeasurementReader, ProfileReader,
    ReaderRegistry, reader_for,
};
pub use retry::{RetryConfig, with_retry};
pub use session::{
    ConnectionGuard, FramedProtocol, FramedSession, PassiveSession, RacpSession, SessionConfig,
    SessionState,
};
pub use transport::{
    Characteristic, ConnectionStream, DeviceId, GattTransport, NotificationStream,
    PeripheralHandle, Service,
};

// Re-export from vitalink-types
pub use vitalink_types::ble;
pub use vitalink_types::{
    BloodPressureSample, CharacteristicMap, DeviceKind, GlucoseSample, GlucoseUnit, Measurement,
    PressureUnit, RacpResponse,
};
