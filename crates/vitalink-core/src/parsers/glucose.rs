//! Glucose Measurement (0x2A18) parser.
//!
//! ```text
//! flags u8
//! sequence u16
//! base time (7 bytes)
//! [time offset i16, minutes]                 flags bit 0
//! [concentration SFLOAT, type/location u8]   flags bit 1
//! [sensor status annunciation u16]           flags bit 3
//! ```
//!
//! Flags bit 2 selects the concentration unit: clear for kg/L, set for
//! mol/L. kg/L is reported as mg/dL and mol/L as mmol/L.

use bytes::Buf;
use vitalink_types::{GlucoseSample, GlucoseUnit};

use super::{get_date_time, get_finite_sfloat};

const FLAG_TIME_OFFSET: u8 = 0x01;
const FLAG_CONCENTRATION: u8 = 0x02;
const FLAG_UNIT_MOL_PER_L: u8 = 0x04;
const FLAG_SENSOR_STATUS: u8 = 0x08;

const KG_PER_L_TO_MG_PER_DL: f64 = 100_000.0;
const MOL_PER_L_TO_MMOL_PER_L: f64 = 1_000.0;

/// Parse one glucose measurement notification.
///
/// Records without a concentration carry nothing to report and are dropped.
pub fn parse_glucose_measurement(data: &[u8]) -> Option<GlucoseSample> {
    let mut buf = data;
    if buf.remaining() < 3 {
        return None;
    }
    let flags = buf.get_u8();
    let sequence = buf.get_u16_le();
    let mut timestamp = get_date_time(&mut buf)?;

    if flags & FLAG_TIME_OFFSET != 0 {
        if buf.remaining() < 2 {
            return None;
        }
        let offset = buf.get_i16_le();
        timestamp = timestamp.checked_add(time::Duration::minutes(i64::from(offset)))?;
    }

    if flags & FLAG_CONCENTRATION == 0 {
        return None;
    }
    let concentration = get_finite_sfloat(&mut buf)?;
    if buf.remaining() < 1 {
        return None;
    }
    let type_location = buf.get_u8();

    if flags & FLAG_SENSOR_STATUS != 0 && buf.remaining() < 2 {
        return None;
    }

    let (value, unit) = if flags & FLAG_UNIT_MOL_PER_L != 0 {
        (concentration * MOL_PER_L_TO_MMOL_PER_L, GlucoseUnit::MmolPerL)
    } else {
        (concentration * KG_PER_L_TO_MG_PER_DL, GlucoseUnit::MgPerDl)
    };

    Some(GlucoseSample {
        sequence,
        timestamp,
        value,
        unit,
        sample_type: Some(type_location & 0x0F),
        sample_location: Some(type_location >> 4),
    })
}
