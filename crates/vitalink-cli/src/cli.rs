//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use vitalink_types::DeviceKind;

#[derive(Debug, Parser)]
#[command(name = "vitalink")]
#[command(
    author,
    version,
    about = "Read stored records from BLE glucose meters and blood-pressure monitors",
    long_about = None
)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Use a different configuration file
    #[arg(long, global = true, env = "VITALINK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable device selection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device address, platform id, name or alias, or use VITALINK_DEVICE env var
    #[arg(short, long, env = "VITALINK_DEVICE")]
    pub device: Option<String>,

    /// Device family (glucose, blood-pressure, blood-pressure-passive, one-touch-verio,
    /// one-touch-verio-iq)
    #[arg(short, long, value_parser = parse_kind)]
    pub kind: Option<DeviceKind>,
}

/// Session timeout overrides, in seconds
#[derive(Debug, Clone, Default, Args)]
pub struct TimeoutArgs {
    /// Deadline for the whole transfer
    #[arg(short = 'T', long)]
    pub timeout: Option<u64>,

    /// Quiet period that ends a passive transfer
    #[arg(long)]
    pub inertia: Option<u64>,

    /// Deadline for each request of a framed transfer
    #[arg(long)]
    pub step_timeout: Option<u64>,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Omit the header row in CSV output
    #[arg(long)]
    pub no_header: bool,

    /// Single-line JSON output
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Connect, discover and enable notifications without transferring records
    Pair {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        timeouts: TimeoutArgs,
    },

    /// Transfer every stored record from a device
    Read {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        timeouts: TimeoutArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the supported device families
    Kinds {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage device aliases
    Alias {
        #[command(subcommand)]
        action: AliasAction,
    },

    /// Show or change CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum AliasAction {
    /// List all aliases
    List,
    /// Create or replace an alias
    Set {
        /// Alias name
        name: String,
        /// Device address, platform id or name
        device: String,
        /// Device family for this device
        #[arg(short, long, value_parser = parse_kind)]
        kind: Option<DeviceKind>,
    },
    /// Remove an alias
    Remove {
        /// Alias name
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the configuration file path
    Path,
    /// Print the current configuration
    Show,
    /// Set a configuration value
    Set {
        #[arg(value_enum)]
        key: ConfigKey,
        value: String,
    },
    /// Clear a configuration value
    Unset {
        #[arg(value_enum)]
        key: ConfigKey,
    },
}

/// Keys accepted by `config set` and `config unset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigKey {
    Device,
    Kind,
    Format,
    Timeout,
    Inertia,
    StepTimeout,
}

fn parse_kind(s: &str) -> Result<DeviceKind, String> {
    s.parse().map_err(|e| format!("{}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_arguments() {
        let cli = Cli::try_parse_from([
            "vitalink", "read", "-d", "meter", "-k", "verio", "-T", "60", "-f", "csv",
        ])
        .unwrap();
        let Commands::Read {
            device,
            timeouts,
            output,
        } = cli.command
        else {
            panic!("expected read");
        };
        assert_eq!(device.device.as_deref(), Some("meter"));
        assert_eq!(device.kind, Some(DeviceKind::OneTouchVerio));
        assert_eq!(timeouts.timeout, Some(60));
        assert_eq!(timeouts.inertia, None);
        assert_eq!(output.format, Some(OutputFormat::Csv));
    }

    #[test]
    fn test_kind_accepts_verio_iq() {
        let cli = Cli::try_parse_from(["vitalink", "pair", "-k", "verio-iq"]).unwrap();
        let Commands::Pair { device, .. } = cli.command else {
            panic!("expected pair");
        };
        assert_eq!(device.kind, Some(DeviceKind::OneTouchVerioIq));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let result = Cli::try_parse_from(["vitalink", "pair", "--kind", "thermometer"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["vitalink", "-v", "-q", "kinds"]);
        assert!(result.is_err());
    }
}
