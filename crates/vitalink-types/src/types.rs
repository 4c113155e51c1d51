//! Sample and device types shared by every reader.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::error::ParseError;

/// Unit of a glucose concentration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum GlucoseUnit {
    /// Milligrams per decilitre.
    MgPerDl,
    /// Millimoles per litre.
    MmolPerL,
}

impl GlucoseUnit {
    /// Conventional display symbol.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            GlucoseUnit::MgPerDl => "mg/dL",
            GlucoseUnit::MmolPerL => "mmol/L",
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unit a blood-pressure monitor reported its measurement in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PressureUnit {
    MmHg,
    KPa,
}

impl PressureUnit {
    /// Conventional display symbol.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureUnit::MmHg => "mmHg",
            PressureUnit::KPa => "kPa",
        }
    }
}

impl fmt::Display for PressureUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// One stored glucose reading.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GlucoseSample {
    /// Sequence number assigned by the meter.
    pub sequence: u16,
    /// Absolute time of the reading (base time plus any time offset).
    pub timestamp: PrimitiveDateTime,
    /// Concentration in `unit`.
    pub value: f64,
    pub unit: GlucoseUnit,
    /// Sample type nibble (capillary whole blood, plasma, ...), when reported.
    pub sample_type: Option<u8>,
    /// Sample location nibble (finger, alternate site, ...), when reported.
    pub sample_location: Option<u8>,
}

/// One stored blood-pressure reading.
///
/// Pressures are always expressed in mmHg. `unit` records what the monitor
/// reported; kPa readings are converted on parse.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BloodPressureSample {
    pub timestamp: PrimitiveDateTime,
    pub systolic: f64,
    pub diastolic: f64,
    /// Pulse rate in beats per minute, when reported.
    pub pulse: Option<f64>,
    pub unit: PressureUnit,
}

/// A sample from any supported device family.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum Measurement {
    Glucose(GlucoseSample),
    BloodPressure(BloodPressureSample),
}

impl Measurement {
    /// Time the measurement was taken.
    #[must_use]
    pub fn timestamp(&self) -> PrimitiveDateTime {
        match self {
            Measurement::Glucose(s) => s.timestamp,
            Measurement::BloodPressure(s) => s.timestamp,
        }
    }
}

impl From<GlucoseSample> for Measurement {
    fn from(sample: GlucoseSample) -> Self {
        Measurement::Glucose(sample)
    }
}

impl From<BloodPressureSample> for Measurement {
    fn from(sample: BloodPressureSample) -> Self {
        Measurement::BloodPressure(sample)
    }
}

/// Service and characteristic UUIDs a reader needs for one device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicMap {
    pub service: Uuid,
    /// Characteristic that notifies records (or framed responses).
    pub measurement: Uuid,
    /// Control characteristic the collector writes to, if the family has one.
    pub control: Option<Uuid>,
}

impl CharacteristicMap {
    /// Every characteristic the map names, measurement first.
    #[must_use]
    pub fn characteristics(&self) -> Vec<Uuid> {
        let mut ids = vec![self.measurement];
        ids.extend(self.control);
        ids
    }
}

/// Supported device families.
///
/// This enum is marked `#[non_exhaustive]` to allow adding device families
/// without breaking downstream code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
#[non_exhaustive]
pub enum DeviceKind {
    /// Glucose meter implementing the 0x1808 profile with RACP.
    Glucose,
    /// Blood-pressure monitor implementing the 0x1810 profile with RACP.
    BloodPressure,
    /// Blood-pressure monitor that pushes stored records without RACP.
    BloodPressurePassive,
    /// OneTouch Verio meter using the vendor framed protocol.
    OneTouchVerio,
    /// OneTouch Verio IQ meter. Same framing, its own requests and records.
    OneTouchVerioIq,
}

impl DeviceKind {
    /// All supported kinds.
    pub const ALL: [DeviceKind; 5] = [
        DeviceKind::Glucose,
        DeviceKind::BloodPressure,
        DeviceKind::BloodPressurePassive,
        DeviceKind::OneTouchVerio,
        DeviceKind::OneTouchVerioIq,
    ];

    /// Whether records are requested through a Record Access Control Point.
    #[must_use]
    pub fn supports_racp(&self) -> bool {
        matches!(self, DeviceKind::Glucose | DeviceKind::BloodPressure)
    }

    /// Identifier used on the command line and in configuration files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceKind::Glucose => "glucose",
            DeviceKind::BloodPressure => "blood-pressure",
            DeviceKind::BloodPressurePassive => "blood-pressure-passive",
            DeviceKind::OneTouchVerio => "one-touch-verio",
            DeviceKind::OneTouchVerioIq => "one-touch-verio-iq",
        }
    }

    /// Short human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            DeviceKind::Glucose => "Glucose meter (0x1808, RACP)",
            DeviceKind::BloodPressure => "Blood-pressure monitor (0x1810, RACP)",
            DeviceKind::BloodPressurePassive => "Blood-pressure monitor (0x1810, no RACP)",
            DeviceKind::OneTouchVerio => "OneTouch Verio meter (vendor framing)",
            DeviceKind::OneTouchVerioIq => "OneTouch Verio IQ meter (vendor framing)",
        }
    }

    /// UUIDs the reader for this kind addresses.
    #[must_use]
    pub fn characteristics(&self) -> CharacteristicMap {
        use crate::uuid as ble;
        match self {
            DeviceKind::Glucose => CharacteristicMap {
                service: ble::GLUCOSE_SERVICE,
                measurement: ble::GLUCOSE_MEASUREMENT,
                control: Some(ble::RECORD_ACCESS_CONTROL_POINT),
            },
            DeviceKind::BloodPressure => CharacteristicMap {
                service: ble::BLOOD_PRESSURE_SERVICE,
                measurement: ble::BLOOD_PRESSURE_MEASUREMENT,
                control: Some(ble::RECORD_ACCESS_CONTROL_POINT),
            },
            DeviceKind::BloodPressurePassive => CharacteristicMap {
                service: ble::BLOOD_PRESSURE_SERVICE,
                measurement: ble::BLOOD_PRESSURE_MEASUREMENT,
                control: None,
            },
            DeviceKind::OneTouchVerio | DeviceKind::OneTouchVerioIq => CharacteristicMap {
                service: ble::VERIO_SERVICE,
                measurement: ble::VERIO_NOTIFY,
                control: Some(ble::VERIO_WRITE),
            },
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "glucose" => Ok(DeviceKind::Glucose),
            "blood-pressure" | "bp" => Ok(DeviceKind::BloodPressure),
            "blood-pressure-passive" | "bp-passive" => Ok(DeviceKind::BloodPressurePassive),
            "one-touch-verio" | "onetouch-verio" | "verio" => Ok(DeviceKind::OneTouchVerio),
            "one-touch-verio-iq" | "onetouch-verio-iq" | "verio-iq" => {
                Ok(DeviceKind::OneTouchVerioIq)
            }
            _ => Err(ParseError::InvalidValue(format!("unknown device kind: {}", s))),
        }
    }
}
