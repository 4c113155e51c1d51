//! Platform-agnostic codecs and types for BLE medical devices.
//!
//! This crate holds the pieces of the record-transfer engine that need no
//! Bluetooth stack and no async runtime, so they can be shared by the engine
//! (vitalink-core), simulators, and offline tooling.
//!
//! # Features
//!
//! - IEEE-11073 SFLOAT codec ([`sfloat`])
//! - Record Access Control Point commands and response classification ([`racp`])
//! - CRC16-CCITT vendor framing ([`frame`])
//! - UUID constants for the glucose, blood-pressure and Verio profiles
//! - Sample types and device kinds
//!
//! # Example
//!
//! ```
//! use vitalink_types::{RacpResponse, sfloat};
//!
//! assert_eq!(RacpResponse::classify(&[0x06, 0x00, 0x01, 0x01]), RacpResponse::Success);
//! assert_eq!(sfloat::decode(sfloat::encode(5.0)), 5.0);
//! ```

pub mod error;
pub mod frame;
pub mod racp;
pub mod sfloat;
pub mod types;
pub mod uuid;

pub use error::{ParseError, ParseResult};
pub use racp::{RacpCommand, RacpOpCode, RacpOperator, RacpResponse};
pub use sfloat::{SFloat, SFloatValue};
pub use types::{
    BloodPressureSample, CharacteristicMap, DeviceKind, GlucoseSample, GlucoseUnit, Measurement,
    PressureUnit,
};
pub use uuid as ble;
