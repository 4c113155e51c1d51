//! Alias command implementation.

use std::path::Path;

use anyhow::{Result, bail};

use crate::cli::AliasAction;
use crate::config::{Alias, Config};

pub fn cmd_alias(action: AliasAction, path: &Path, quiet: bool) -> Result<()> {
    let mut config = Config::load(path);
    match action {
        AliasAction::List => {
            if config.aliases.is_empty() {
                if !quiet {
                    eprintln!("No aliases defined. Add one with `vitalink alias set <NAME> <DEVICE>`");
                }
                return Ok(());
            }
            for (name, alias) in &config.aliases {
                match alias.kind {
                    Some(kind) => println!("{} -> {} ({})", name, alias.device, kind),
                    None => println!("{} -> {}", name, alias.device),
                }
            }
        }
        AliasAction::Set { name, device, kind } => {
            if name.trim().is_empty() {
                bail!("Alias name cannot be empty");
            }
            let replaced = config
                .aliases
                .insert(name.clone(), Alias { device, kind })
                .is_some();
            config.save(path)?;
            if !quiet {
                let verb = if replaced { "Updated" } else { "Added" };
                eprintln!("{} alias '{}'", verb, name);
            }
        }
        AliasAction::Remove { name } => {
            if config.aliases.remove(&name).is_none() {
                bail!("No alias named '{}'", name);
            }
            config.save(path)?;
            if !quiet {
                eprintln!("Removed alias '{}'", name);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use vitalink_types::DeviceKind;

    #[test]
    fn test_set_and_remove_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        cmd_alias(
            AliasAction::Set {
                name: "kitchen".to_string(),
                device: "AA:BB:CC:DD:EE:FF".to_string(),
                kind: Some(DeviceKind::Glucose),
            },
            &path,
            true,
        )
        .unwrap();
        let config = Config::load(&path);
        assert_eq!(config.aliases["kitchen"].kind, Some(DeviceKind::Glucose));

        cmd_alias(
            AliasAction::Remove {
                name: "kitchen".to_string(),
            },
            &path,
            true,
        )
        .unwrap();
        assert!(Config::load(&path).aliases.is_empty());
    }

    #[test]
    fn test_remove_unknown_alias() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let action = AliasAction::Remove {
            name: "nope".to_string(),
        };
        assert!(cmd_alias(action, &path, true).is_err());
    }
}
