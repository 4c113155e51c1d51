//! Output formatting utilities for text, JSON, and CSV output.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use time::PrimitiveDateTime;
use time::macros::format_description;
use vitalink_core::DeviceId;
use vitalink_types::{BloodPressureSample, DeviceKind, GlucoseSample, Measurement};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
}

impl FormatOptions {
    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }
}

/// Escape a value for inclusion in CSV output.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// `YYYY-MM-DD HH:MM:SS`, in the device's local clock.
#[must_use]
pub fn format_timestamp(timestamp: PrimitiveDateTime) -> String {
    let layout = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    timestamp
        .format(layout)
        .unwrap_or_else(|_| timestamp.to_string())
}

fn optional(value: Option<impl ToString>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ============================================================================
// Measurement formatting
// ============================================================================

fn glucose_text(sample: &GlucoseSample) -> String {
    format!(
        "{}  #{:<5}  {:>6.1} {}",
        format_timestamp(sample.timestamp),
        sample.sequence,
        sample.value,
        sample.unit
    )
}

fn blood_pressure_text(sample: &BloodPressureSample) -> String {
    let mut line = format!(
        "{}  {:>3.0}/{:<3.0} mmHg",
        format_timestamp(sample.timestamp),
        sample.systolic,
        sample.diastolic
    );
    if let Some(pulse) = sample.pulse {
        let _ = write!(line, "  pulse {:.0} bpm", pulse);
    }
    line
}

#[must_use]
pub fn format_measurements_text(
    measurements: &[Measurement],
    device: &DeviceId,
    kind: DeviceKind,
) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} ({}): {} record{}",
        device,
        kind,
        measurements.len(),
        if measurements.len() == 1 { "" } else { "s" }
    );
    for measurement in measurements {
        let line = match measurement {
            Measurement::Glucose(sample) => glucose_text(sample),
            Measurement::BloodPressure(sample) => blood_pressure_text(sample),
        };
        let _ = writeln!(output, "  {}", line);
    }
    output
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MeasurementJson<'a> {
    Glucose {
        timestamp: String,
        sequence: u16,
        value: f64,
        unit: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_type: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        sample_location: Option<u8>,
    },
    BloodPressure {
        timestamp: String,
        systolic: f64,
        diastolic: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        pulse: Option<f64>,
        unit: &'static str,
        reported_unit: &'a str,
    },
}

impl<'a> From<&'a Measurement> for MeasurementJson<'a> {
    fn from(measurement: &'a Measurement) -> Self {
        match measurement {
            Measurement::Glucose(s) => MeasurementJson::Glucose {
                timestamp: format_timestamp(s.timestamp),
                sequence: s.sequence,
                value: s.value,
                unit: s.unit.symbol(),
                sample_type: s.sample_type,
                sample_location: s.sample_location,
            },
            Measurement::BloodPressure(s) => MeasurementJson::BloodPressure {
                timestamp: format_timestamp(s.timestamp),
                systolic: s.systolic,
                diastolic: s.diastolic,
                pulse: s.pulse,
                unit: "mmHg",
                reported_unit: s.unit.symbol(),
            },
        }
    }
}

pub fn format_measurements_json(
    measurements: &[Measurement],
    device: &DeviceId,
    kind: DeviceKind,
    opts: &FormatOptions,
) -> Result<String> {
    #[derive(Serialize)]
    struct ReadResult<'a> {
        device: &'a str,
        kind: DeviceKind,
        count: usize,
        measurements: Vec<MeasurementJson<'a>>,
    }

    let result = ReadResult {
        device: device.as_str(),
        kind,
        count: measurements.len(),
        measurements: measurements.iter().map(MeasurementJson::from).collect(),
    };
    opts.as_json(&result)
}

const CSV_HEADER: &str =
    "type,timestamp,sequence,glucose,glucose_unit,systolic_mmhg,diastolic_mmhg,pulse_bpm\n";

#[must_use]
pub fn format_measurements_csv(measurements: &[Measurement], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        CSV_HEADER.to_string()
    };
    for measurement in measurements {
        let _ = match measurement {
            Measurement::Glucose(s) => writeln!(
                output,
                "glucose,{},{},{},{},,,",
                csv_escape(&format_timestamp(s.timestamp)),
                s.sequence,
                s.value,
                csv_escape(s.unit.symbol())
            ),
            Measurement::BloodPressure(s) => writeln!(
                output,
                "blood_pressure,{},,,,{},{},{}",
                csv_escape(&format_timestamp(s.timestamp)),
                s.systolic,
                s.diastolic,
                optional(s.pulse)
            ),
        };
    }
    output
}

// ============================================================================
// Device kind formatting
// ============================================================================

#[must_use]
pub fn format_kinds_text(kinds: &[DeviceKind]) -> String {
    let width = kinds.iter().map(|k| k.as_str().len()).max().unwrap_or(0);
    kinds
        .iter()
        .map(|k| format!("{:<width$}  {}\n", k.as_str(), k.description()))
        .collect()
}

pub fn format_kinds_json(kinds: &[DeviceKind], opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct KindJson {
        kind: DeviceKind,
        description: &'static str,
        racp: bool,
    }

    let rows: Vec<KindJson> = kinds
        .iter()
        .map(|&kind| KindJson {
            kind,
            description: kind.description(),
            racp: kind.supports_racp(),
        })
        .collect();
    opts.as_json(&rows)
}

#[must_use]
pub fn format_kinds_csv(kinds: &[DeviceKind], opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "kind,description,racp\n".to_string()
    };
    for kind in kinds {
        let _ = writeln!(
            output,
            "{},{},{}",
            kind.as_str(),
            csv_escape(kind.description()),
            kind.supports_racp()
        );
    }
    output
}
