//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, path: &Path, quiet: bool) -> Result<()> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let config = Config::load(path);
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            if content.trim().is_empty() && !quiet {
                eprintln!("No settings in {}", path.display());
            }
            print!("{}", content);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load(path);
            config.set(key, &value)?;
            config.save(path)?;
            if !quiet {
                eprintln!("Saved {}", path.display());
            }
        }
        ConfigAction::Unset { key } => {
            let mut config = Config::load(path);
            config.unset(key);
            config.save(path)?;
            if !quiet {
                eprintln!("Saved {}", path.display());
            }
        }
    }
    Ok(())
}
