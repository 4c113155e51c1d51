//! Blood Pressure Measurement (0x2A35) parser.
//!
//! ```text
//! flags u8
//! systolic, diastolic, mean arterial pressure (SFLOAT each)
//! [timestamp (7 bytes)]          flags bit 1
//! [pulse rate SFLOAT]            flags bit 2
//! [user id u8]                   flags bit 3
//! [measurement status u16]       flags bit 4
//! ```
//!
//! Flags bit 0 set means the pressures are in kPa.

use bytes::Buf;
use vitalink_types::{BloodPressureSample, PressureUnit};

use super::{get_date_time, get_finite_sfloat};

const FLAG_UNIT_KPA: u8 = 0x01;
const FLAG_TIMESTAMP: u8 = 0x02;
const FLAG_PULSE_RATE: u8 = 0x04;
const FLAG_USER_ID: u8 = 0x08;
const FLAG_MEASUREMENT_STATUS: u8 = 0x10;

/// mmHg per kPa.
pub const KPA_TO_MMHG: f64 = 7.50062;

/// Parse one stored blood-pressure record.
///
/// Stored records must carry a timestamp; records without one are dropped.
/// kPa pressures are converted to mmHg and the sample keeps
/// [`PressureUnit::KPa`] as its unit tag.
pub fn parse_blood_pressure_measurement(data: &[u8]) -> Option<BloodPressureSample> {
    let mut buf = data;
    if buf.remaining() < 1 {
        return None;
    }
    let flags = buf.get_u8();
    if flags & FLAG_TIMESTAMP == 0 {
        return None;
    }

    let systolic = get_finite_sfloat(&mut buf)?;
    let diastolic = get_finite_sfloat(&mut buf)?;
    // Mean arterial pressure is not reported, but must still be present.
    if buf.remaining() < 2 {
        return None;
    }
    buf.advance(2);

    let timestamp = get_date_time(&mut buf)?;

    let pulse = if flags & FLAG_PULSE_RATE != 0 {
        Some(get_finite_sfloat(&mut buf)?)
    } else {
        None
    };

    let trailing = usize::from(flags & FLAG_USER_ID != 0)
        + 2 * usize::from(flags & FLAG_MEASUREMENT_STATUS != 0);
    if buf.remaining() < trailing {
        return None;
    }

    let (unit, scale) = if flags & FLAG_UNIT_KPA != 0 {
        (PressureUnit::KPa, KPA_TO_MMHG)
    } else {
        (PressureUnit::MmHg, 1.0)
    };

    Some(BloodPressureSample {
        timestamp,
        systolic: systolic * scale,
        diastolic: diastolic * scale,
        pulse,
        unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::test_support::{date_time_bytes, sfloat_bytes};
    use time::macros::datetime;

    fn record(flags: u8, systolic: f64, diastolic: f64, pulse: Option<f64>) -> Vec<u8> {
        let mut data = vec![flags];
        data.extend_from_slice(&sfloat_bytes(systolic));
        data.extend_from_slice(&sfloat_bytes(diastolic));
        data.extend_from_slice(&sfloat_bytes((systolic + 2.0 * diastolic) / 3.0));
        if flags & FLAG_TIMESTAMP != 0 {
            data.extend(date_time_bytes(2024, 5, 17, 7, 30, 0));
        }
        if let Some(pulse) = pulse {
            data.extend_from_slice(&sfloat_bytes(pulse));
        }
        data
    }

    #[test]
    fn test_parse_mmhg_without_pulse() {
        let data = record(0b0000_0010, 120.0, 80.0, None);
        let sample = parse_blood_pressure_measurement(&data).unwrap();

        assert!((sample.systolic - 120.0).abs() < 0.01);
        assert!((sample.diastolic - 80.0).abs() < 0.01);
        assert_eq!(sample.unit, PressureUnit::MmHg);
        assert_eq!(sample.pulse, None);
        assert_eq!(sample.timestamp, datetime!(2024-05-17 07:30:00));
    }

    #[test]
    fn test_missing_timestamp_dropped() {
        let data = record(0b0000_0000, 120.0, 80.0, None);
        assert_eq!(parse_blood_pressure_measurement(&data), None);
    }

    #[test]
    fn test_parse_with_pulse() {
        let data = record(0b0000_0110, 118.0, 76.0, Some(64.0));
        let sample = parse_blood_pressure_measurement(&data).unwrap();
        assert_eq!(sample.pulse, Some(64.0));
    }

    #[test]
    fn test_kpa_converted_to_mmhg() {
        let data = record(0b0000_0011, 16.0, 10.7, None);
        let sample = parse_blood_pressure_measurement(&data).unwrap();

        assert_eq!(sample.unit, PressureUnit::KPa);
        assert!((sample.systolic - 16.0 * KPA_TO_MMHG).abs() < 0.01);
        assert!((sample.diastolic - 10.7 * KPA_TO_MMHG).abs() < 0.01);
    }

    #[test]
    fn test_user_id_and_status_skipped() {
        let mut data = record(0b0001_1110, 120.0, 80.0, Some(70.0));
        assert_eq!(parse_blood_pressure_measurement(&data), None);

        data.push(0x01);
        data.extend_from_slice(&[0x00, 0x00]);
        let sample = parse_blood_pressure_measurement(&data).unwrap();
        assert_eq!(sample.pulse, Some(70.0));
    }

    #[test]
    fn test_non_finite_pressure_dropped() {
        let mut data = record(0b0000_0010, 120.0, 80.0, None);
        data[1..3].copy_from_slice(&vitalink_types::sfloat::NAN.to_le_bytes());
        assert_eq!(parse_blood_pressure_measurement(&data), None);
    }

    #[test]
    fn test_truncated_records_dropped() {
        let data = record(0b0000_0110, 120.0, 80.0, Some(60.0));
        for len in 0..data.len() {
            assert_eq!(parse_blood_pressure_measurement(&data[..len]), None, "len {}", len);
        }
    }
}
