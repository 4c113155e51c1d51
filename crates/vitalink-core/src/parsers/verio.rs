//! OneTouch Verio family record payloads.
//!
//! Two generations share the frame codec but not their requests or record
//! layouts: the original Verio and the Verio IQ.
//!
//! These parse the payload of an already validated response frame, after
//! the leading success byte. Frame validation itself lives in
//! [`vitalink_types::frame`] and failures there are fatal to the exchange.

use bytes::Buf;
use time::PrimitiveDateTime;
use time::macros::datetime;
use vitalink_types::{GlucoseSample, GlucoseUnit};

/// Meter clocks count seconds from this local time.
pub const VERIO_EPOCH: PrimitiveDateTime = datetime!(2000-01-01 00:00:00);

/// Request payload asking for the number of stored records.
pub const READ_RECORD_COUNT: [u8; 2] = [0x27, 0x00];

/// Opcode of the request reading one record by index.
pub const READ_RECORD: u8 = 0xB3;

const FLAG_CONTROL_SOLUTION: u8 = 0x01;

/// Verio IQ request payload asking for the number of stored records.
pub const IQ_READ_RECORD_COUNT: [u8; 3] = [0x0A, 0x02, 0x06];

/// Verio IQ opcode prefix reading one record by index.
pub const IQ_READ_RECORD: [u8; 2] = [0x0A, 0x31];

const IQ_FLAG_CONTROL_SOLUTION: u8 = 0x04;

/// Highest concentration the Verio IQ measures; above it the meter stores "HI".
pub const IQ_MAX_MG_PER_DL: u16 = 600;

/// Request payload reading the record at `index`.
pub fn read_record_request(index: u16) -> Vec<u8> {
    let [lo, hi] = index.to_le_bytes();
    vec![READ_RECORD, lo, hi]
}

/// Verio IQ request payload reading the record at `index`.
pub fn iq_read_record_request(index: u16) -> Vec<u8> {
    let mut request = IQ_READ_RECORD.to_vec();
    request.extend_from_slice(&index.to_le_bytes());
    request
}

/// Parse the response to [`READ_RECORD_COUNT`]: a little-endian `u16`.
pub fn parse_verio_record_count(data: &[u8]) -> Option<u16> {
    let mut buf = data;
    if buf.remaining() < 2 {
        return None;
    }
    Some(buf.get_u16_le())
}

/// Parse one stored record.
///
/// ```text
/// index u16 | seconds since 2000-01-01 u32 | glucose mg/dL u16 | flags u8
/// ```
///
/// Control-solution tests (flags bit 0) are not patient readings and are
/// dropped.
pub fn parse_verio_record(data: &[u8]) -> Option<GlucoseSample> {
    let mut buf = data;
    if buf.remaining() < 9 {
        return None;
    }
    let sequence = buf.get_u16_le();
    let seconds = buf.get_u32_le();
    let value = buf.get_u16_le();
    let flags = buf.get_u8();

    if flags & FLAG_CONTROL_SOLUTION != 0 {
        return None;
    }

    let timestamp = VERIO_EPOCH.checked_add(time::Duration::seconds(i64::from(seconds)))?;
    Some(GlucoseSample {
        sequence,
        timestamp,
        value: f64::from(value),
        unit: GlucoseUnit::MgPerDl,
        sample_type: None,
        sample_location: None,
    })
}

/// Parse the response to [`IQ_READ_RECORD_COUNT`]: a little-endian `u32`.
///
/// Counts that do not fit a record index are rejected.
pub fn parse_verio_iq_record_count(data: &[u8]) -> Option<u16> {
    let mut buf = data;
    if buf.remaining() < 4 {
        return None;
    }
    u16::try_from(buf.get_u32_le()).ok()
}

/// Parse one stored Verio IQ record.
///
/// ```text
/// seconds since 2000-01-01 u32 | glucose mg/dL u16 | index u16 | meal u8 | flags u8
/// ```
///
/// Control-solution tests (flags bit 2) and readings above the meter's range
/// are dropped.
pub fn parse_verio_iq_record(data: &[u8]) -> Option<GlucoseSample> {
    let mut buf = data;
    if buf.remaining() < 10 {
        return None;
    }
    let seconds = buf.get_u32_le();
    let value = buf.get_u16_le();
    let sequence = buf.get_u16_le();
    let _meal = buf.get_u8();
    let flags = buf.get_u8();

    if flags & IQ_FLAG_CONTROL_SOLUTION != 0 || value > IQ_MAX_MG_PER_DL {
        return None;
    }

    let timestamp = VERIO_EPOCH.checked_add(time::Duration::seconds(i64::from(seconds)))?;
    Some(GlucoseSample {
        sequence,
        timestamp,
        value: f64::from(value),
        unit: GlucoseUnit::MgPerDl,
        sample_type: None,
        sample_location: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_bytes(index: u16, seconds: u32, value: u16, flags: u8) -> Vec<u8> {
        let mut data = index.to_le_bytes().to_vec();
        data.extend_from_slice(&seconds.to_le_bytes());
        data.extend_from_slice(&value.to_le_bytes());
        data.push(flags);
        data
    }

    fn iq_record_bytes(seconds: u32, value: u16, index: u16, flags: u8) -> Vec<u8> {
        let mut data = seconds.to_le_bytes().to_vec();
        data.extend_from_slice(&value.to_le_bytes());
        data.extend_from_slice(&index.to_le_bytes());
        data.extend_from_slice(&[0x01, flags]);
        data
    }

    #[test]
    fn test_read_record_request() {
        assert_eq!(read_record_request(0x0102), [0xB3, 0x02, 0x01]);
        assert_eq!(iq_read_record_request(0x0102), [0x0A, 0x31, 0x02, 0x01]);
    }

    #[test]
    fn test_parse_record_count() {
        assert_eq!(parse_verio_record_count(&[0x2C, 0x01]), Some(300));
        assert_eq!(parse_verio_record_count(&[0x2C]), None);
    }

    #[test]
    fn test_parse_record() {
        // 2024-01-01 00:00:00 is 8766 days after the epoch.
        let seconds = 8766 * 86_400 + 3_600;
        let data = record_bytes(4, seconds, 132, 0x00);
        let sample = parse_verio_record(&data).unwrap();

        assert_eq!(sample.sequence, 4);
        assert_eq!(sample.timestamp, datetime!(2024-01-01 01:00:00));
        assert_eq!(sample.value, 132.0);
        assert_eq!(sample.unit, GlucoseUnit::MgPerDl);
    }

    #[test]
    fn test_control_solution_dropped() {
        let data = record_bytes(4, 0, 110, FLAG_CONTROL_SOLUTION);
        assert_eq!(parse_verio_record(&data), None);
    }

    #[test]
    fn test_short_record_dropped() {
        let data = record_bytes(4, 0, 110, 0);
        assert_eq!(parse_verio_record(&data[..8]), None);
    }

    #[test]
    fn test_parse_iq_record_count() {
        assert_eq!(parse_verio_iq_record_count(&[0x2C, 0x01, 0x00, 0x00]), Some(300));
        assert_eq!(parse_verio_iq_record_count(&[0x00, 0x00, 0x01, 0x00]), None);
        assert_eq!(parse_verio_iq_record_count(&[0x2C, 0x01]), None);
    }

    #[test]
    fn test_parse_iq_record() {
        let seconds = 8766 * 86_400 + 90;
        let sample = parse_verio_iq_record(&iq_record_bytes(seconds, 97, 12, 0x00)).unwrap();

        assert_eq!(sample.sequence, 12);
        assert_eq!(sample.timestamp, datetime!(2024-01-01 00:01:30));
        assert_eq!(sample.value, 97.0);

        // A Verio record is too short for the IQ layout.
        assert_eq!(parse_verio_iq_record(&record_bytes(4, seconds, 97, 0)), None);
    }

    #[test]
    fn test_iq_control_solution_and_high_dropped() {
        assert_eq!(parse_verio_iq_record(&iq_record_bytes(0, 110, 1, 0x04)), None);
        assert_eq!(parse_verio_iq_record(&iq_record_bytes(0, 601, 1, 0x00)), None);
        assert!(parse_verio_iq_record(&iq_record_bytes(0, 600, 1, 0x01)).is_some());
    }
}
