//! Read command implementation.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use soilsense_core::{BleTransport, FallbackPolicy, Snapshot, SnapshotClient};

use crate::cli::{AcquireArgs, OutputFormat};
use crate::config::Config;
use crate::format::{as_json, format_snapshot_text};
use crate::util::{PromptChooser, require_terminal, write_output};

/// Acquire one snapshot with the configured identity and budget, applying
/// command-line overrides.
pub async fn acquire(config: &Config, args: &AcquireArgs, quiet: bool) -> Result<Snapshot> {
    let mut acquisition = config.acquisition_config();
    if let Some(ms) = args.timeout {
        acquisition = acquisition.notify_timeout(Duration::from_millis(ms));
    }
    if args.no_fallback {
        acquisition = acquisition.fallback(FallbackPolicy::FailOnTimeout);
    }
    if let Some(name) = &args.device_name {
        acquisition = acquisition.device_name(name.clone());
    }

    let mut transport = BleTransport::with_options(config.ble_options());
    if args.pick {
        require_terminal()?;
        transport = transport.chooser(PromptChooser);
    }

    if !quiet {
        eprintln!("Looking for {}...", acquisition.device_name);
    }

    let client = SnapshotClient::new(transport, acquisition);
    client
        .acquire_snapshot()
        .await
        .context("Failed to acquire a soil snapshot")
}

pub async fn cmd_read(
    config: &Config,
    args: &AcquireArgs,
    format: OutputFormat,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    let snapshot = acquire(config, args, quiet).await?;

    let content = match format {
        OutputFormat::Json => as_json(&snapshot)?,
        OutputFormat::Text => format_snapshot_text(&snapshot),
    };
    write_output(output, &content)
}
