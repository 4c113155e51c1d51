//! Kinds command implementation.

use anyhow::Result;
use vitalink_types::DeviceKind;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_kinds_csv, format_kinds_json, format_kinds_text};
use crate::util::write_output;

pub fn cmd_kinds(format: OutputFormat) -> Result<()> {
    let opts = FormatOptions::default();
    let content = match format {
        OutputFormat::Text => format_kinds_text(&DeviceKind::ALL),
        OutputFormat::Json => format_kinds_json(&DeviceKind::ALL, &opts)?,
        OutputFormat::Csv => format_kinds_csv(&DeviceKind::ALL, &opts),
    };
    write_output(None, &content)
}
