//! `vitalink`: read stored records from BLE glucose meters and
//! blood-pressure monitors.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pair` | Connect, discover and enable notifications |
//! | `read` | Transfer every stored record |
//! | `kinds` | List supported device families |
//! | `alias` | Manage device aliases |
//! | `config` | Manage CLI configuration |
//!
//! Configuration lives in `<config_dir>/vitalink/config.toml`. Command-line
//! flags override it; `VITALINK_DEVICE` stands in for `--device`.

mod cli;
mod commands;
mod config;
mod format;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::{cmd_alias, cmd_config, cmd_kinds, cmd_pair, cmd_read};
use crate::config::{Config, resolve_target, session_config};
use crate::format::FormatOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);

    match cli.command {
        Commands::Pair { device, timeouts } => {
            let config = Config::load(&config_path);
            let target = resolve_target(device.device.as_deref(), device.kind, &config)?;
            let session = session_config(&timeouts, &config)?;
            cmd_pair(&target, session, cli.quiet).await
        }
        Commands::Read {
            device,
            timeouts,
            output,
        } => {
            let config = Config::load(&config_path);
            let target = resolve_target(device.device.as_deref(), device.kind, &config)?;
            if let Some(alias) = &target.alias
                && !cli.quiet
            {
                eprintln!("Using device '{}' -> {}", alias, target.device);
            }
            let session = session_config(&timeouts, &config)?;
            let format = output
                .format
                .or_else(|| config.output_format())
                .unwrap_or_default();
            let opts = FormatOptions {
                no_header: output.no_header,
                compact: output.compact,
            };
            cmd_read(
                &target,
                session,
                format,
                output.output.as_ref(),
                cli.quiet,
                &opts,
            )
            .await
        }
        Commands::Kinds { format } => cmd_kinds(format),
        Commands::Alias { action } => cmd_alias(action, &config_path, cli.quiet),
        Commands::Config { action } => cmd_config(action, &config_path, cli.quiet),
    }
}
