//! Configuration file management.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;
use vitalink_core::{DeviceId, SessionConfig};
use vitalink_types::DeviceKind;

use crate::cli::{ConfigKey, OutputFormat, TimeoutArgs};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device (address, platform id, name or alias)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Default device family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeviceKind>,

    /// Default output format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Session timeout overrides
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Device aliases (friendly name -> device)
    #[serde(default)]
    pub aliases: BTreeMap<String, Alias>,
}

/// Timeouts in seconds. Unset values keep the engine defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u64>,
}

/// A named device, optionally remembering its family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub device: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeviceKind>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vitalink")
            .join("config.toml")
    }

    /// Load config from `path`, or return default if it is missing or unreadable.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::read(path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    /// Save config to `path`, creating its directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// Configured output format, if it names one.
    pub fn output_format(&self) -> Option<OutputFormat> {
        let name = self.format.as_deref()?;
        match OutputFormat::from_str(name, true) {
            Ok(format) => Some(format),
            Err(_) => {
                warn!("Unknown output format '{}' in config", name);
                None
            }
        }
    }

    /// Apply `config set`.
    pub fn set(&mut self, key: ConfigKey, value: &str) -> Result<()> {
        match key {
            ConfigKey::Device => self.device = Some(value.to_string()),
            ConfigKey::Kind => self.kind = Some(parse_kind(value)?),
            ConfigKey::Format => {
                if OutputFormat::from_str(value, true).is_err() {
                    bail!("Unknown output format '{}' (expected text, json or csv)", value);
                }
                self.format = Some(value.to_lowercase());
            }
            ConfigKey::Timeout => self.timeouts.overall = Some(parse_seconds(value)?),
            ConfigKey::Inertia => self.timeouts.inertia = Some(parse_seconds(value)?),
            ConfigKey::StepTimeout => self.timeouts.step = Some(parse_seconds(value)?),
        }
        Ok(())
    }

    /// Apply `config unset`.
    pub fn unset(&mut self, key: ConfigKey) {
        match key {
            ConfigKey::Device => self.device = None,
            ConfigKey::Kind => self.kind = None,
            ConfigKey::Format => self.format = None,
            ConfigKey::Timeout => self.timeouts.overall = None,
            ConfigKey::Inertia => self.timeouts.inertia = None,
            ConfigKey::StepTimeout => self.timeouts.step = None,
        }
    }
}

fn parse_kind(value: &str) -> Result<DeviceKind> {
    value
        .parse()
        .with_context(|| format!("Invalid device kind '{}'", value))
}

fn parse_seconds(value: &str) -> Result<u64> {
    let seconds: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid number of seconds '{}'", value))?;
    if seconds == 0 {
        bail!("Timeouts must be at least one second");
    }
    Ok(seconds)
}

/// Device and family a command should talk to.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub device: DeviceId,
    pub kind: DeviceKind,
    /// Alias the device was selected through, if any.
    pub alias: Option<String>,
}

/// Resolve the device from the argument (or env var) or the config, then
/// resolve aliases. The family comes from the argument, the alias or the
/// config, in that order.
pub fn resolve_target(
    device: Option<&str>,
    kind: Option<DeviceKind>,
    config: &Config,
) -> Result<Target> {
    let Some(requested) = device.or(config.device.as_deref()) else {
        bail!(
            "No device specified. Use --device, set VITALINK_DEVICE, or run \
             `vitalink config set device <DEVICE>`"
        );
    };

    let alias = config.aliases.get(requested);
    let kind = kind
        .or_else(|| alias.and_then(|a| a.kind))
        .or(config.kind);
    let Some(kind) = kind else {
        bail!(
            "No device kind for '{}'. Use --kind or run `vitalink config set kind <KIND>`",
            requested
        );
    };

    Ok(Target {
        device: DeviceId::new(alias.map_or(requested, |a| a.device.as_str())),
        kind,
        alias: alias.map(|_| requested.to_string()),
    })
}

/// Build the session config: engine defaults, then the config file, then flags.
pub fn session_config(args: &TimeoutArgs, config: &Config) -> Result<SessionConfig> {
    let mut session = SessionConfig::default();
    if let Some(secs) = args.timeout.or(config.timeouts.overall) {
        session = session.overall_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.inertia.or(config.timeouts.inertia) {
        session = session.inertia_timeout(Duration::from_secs(secs));
    }
    if let Some(secs) = args.step_timeout.or(config.timeouts.step) {
        session = session.step_timeout(Duration::from_secs(secs));
    }
    session.validate().context("Invalid timeouts")?;
    Ok(session)
}
