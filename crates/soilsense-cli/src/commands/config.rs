//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;

pub fn cmd_config(action: ConfigAction, explicit: Option<&Path>, quiet: bool) -> Result<()> {
    let path = Config::resolve_path(explicit);
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Show => {
            let config = Config::load(explicit)?;
            let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", text);
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config file already exists: {}\nUse --force to overwrite it.",
                    path.display()
                );
            }
            Config::default().save(&path)?;
            if !quiet {
                eprintln!("Wrote default configuration to {}", path.display());
            }
        }
    }
    Ok(())
}
