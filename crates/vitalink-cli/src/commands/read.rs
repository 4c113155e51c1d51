//! Read command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use vitalink_core::{ReaderRegistry, SessionConfig, SessionMetrics};

use crate::cli::OutputFormat;
use crate::config::Target;
use crate::format::{
    FormatOptions, format_measurements_csv, format_measurements_json, format_measurements_text,
};
use crate::util::{cancel_on_ctrl_c, open_central, show_progress, write_output};

pub async fn cmd_read(
    target: &Target,
    config: SessionConfig,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
    opts: &FormatOptions,
) -> Result<()> {
    let metrics = SessionMetrics::shared();
    let mut config = cancel_on_ctrl_c(config).metrics(metrics.clone());
    if !quiet {
        config = show_progress(config);
    }

    let registry = ReaderRegistry::with_defaults(open_central().await?, config);
    let measurements = registry
        .read(target.kind, &target.device)
        .await
        .with_context(|| format!("Failed to read records from {}", target.device))?;

    let dropped = metrics.snapshot().records_dropped;
    if dropped > 0 && !quiet {
        eprintln!("Skipped {} malformed record(s)", dropped);
    }

    let content = match format {
        OutputFormat::Text => format_measurements_text(&measurements, &target.device, target.kind),
        OutputFormat::Json => {
            format_measurements_json(&measurements, &target.device, target.kind, opts)?
        }
        OutputFormat::Csv => format_measurements_csv(&measurements, opts),
    };
    write_output(output, &content)
}
