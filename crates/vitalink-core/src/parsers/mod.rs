//! Record parsers: one notification payload in, at most one sample out.
//!
//! Parsers are pure. Anything short, malformed, out of range or non-finite
//! yields `None`; the session counts it as a dropped record and carries on.

use bytes::Buf;
use time::{Date, Month, PrimitiveDateTime, Time};
use vitalink_types::SFloat;

pub mod blood_pressure;
pub mod glucose;
pub mod verio;

pub use blood_pressure::parse_blood_pressure_measurement;
pub use glucose::parse_glucose_measurement;
pub use verio::{
    parse_verio_iq_record, parse_verio_iq_record_count, parse_verio_record,
    parse_verio_record_count,
};

/// A record parser as injected into a session.
pub type RecordParser<S> = fn(&[u8]) -> Option<S>;

/// Size of the GATT "Date Time" structure.
pub(crate) const DATE_TIME_LEN: usize = 7;

/// Read a GATT "Date Time" (year u16, month, day, hours, minutes, seconds).
///
/// Year 0 or month 0 ("not known") and impossible dates yield `None`.
pub(crate) fn get_date_time(buf: &mut &[u8]) -> Option<PrimitiveDateTime> {
    if buf.remaining() < DATE_TIME_LEN {
        return None;
    }
    let year = buf.get_u16_le();
    let month = buf.get_u8();
    let day = buf.get_u8();
    let hour = buf.get_u8();
    let minute = buf.get_u8();
    let second = buf.get_u8();

    if year == 0 {
        return None;
    }
    let month = Month::try_from(month).ok()?;
    let date = Date::from_calendar_date(i32::from(year), month, day).ok()?;
    let time = Time::from_hms(hour, minute, second).ok()?;
    Some(PrimitiveDateTime::new(date, time))
}

/// Read an SFLOAT and keep it only if it is an ordinary number.
pub(crate) fn get_finite_sfloat(buf: &mut &[u8]) -> Option<f64> {
    if buf.remaining() < 2 {
        return None;
    }
    SFloat::from_bits(buf.get_u16_le()).classify().finite()
}
