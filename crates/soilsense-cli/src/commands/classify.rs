//! Classify command implementation.

use std::path::PathBuf;

use anyhow::Result;
use soilsense_core::SensorReading;

use crate::cli::OutputFormat;
use crate::config::Config;
use crate::format::{ClassifyReport, as_json, format_profile_text, format_reading_text};
use crate::util::write_output;

pub fn cmd_classify(
    config: &Config,
    moisture: f32,
    ec: f32,
    ph: Option<f32>,
    format: OutputFormat,
    output: Option<&PathBuf>,
) -> Result<()> {
    let mut reading = SensorReading::from_channels(moisture, ec);
    if let Some(ph) = ph {
        reading = reading.with_ph(ph);
    }
    let profile = config.thresholds.profile(&reading);

    let content = match format {
        OutputFormat::Json => as_json(&ClassifyReport {
            reading: &reading,
            profile: &profile,
        })?,
        OutputFormat::Text => {
            format!(
                "{}\n{}",
                format_reading_text(&reading),
                format_profile_text(&profile)
            )
        }
    };
    write_output(output, &content)
}
