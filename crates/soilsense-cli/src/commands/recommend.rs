//! Recommend command implementation.

use std::path::PathBuf;

use anyhow::Result;
use soilsense_core::{LandArea, plan};
use tracing::info;

use crate::cli::{AcquireArgs, ContextArgs, OutputFormat, ReadingArgs, UnitArg};
use crate::commands::acquire;
use crate::config::Config;
use crate::format::{RecommendReport, as_json, format_recommendation_text};
use crate::util::write_output;

/// Arguments for the recommend command
pub struct RecommendArgs {
    pub context: ContextArgs,
    pub reading: ReadingArgs,
    pub acquire: AcquireArgs,
    pub area: Option<f64>,
    pub unit: Option<UnitArg>,
    pub format: OutputFormat,
}

pub async fn cmd_recommend(
    config: &Config,
    args: RecommendArgs,
    output: Option<&PathBuf>,
    quiet: bool,
) -> Result<()> {
    // Validate everything before touching the radio.
    let context = args.context.context();
    config.vocabulary.check_context(&context)?;
    let book = config.rule_book(None)?;
    let area = args
        .area
        .map(|value| {
            let unit = args.unit.map_or(config.area_unit, Into::into);
            LandArea::new(value, unit)
        })
        .transpose()?;

    let reading = match args.reading.reading() {
        Some(reading) => reading,
        None => {
            let snapshot = acquire(config, &args.acquire, quiet).await?;
            args.reading.apply_ph(snapshot.reading)
        }
    };

    let recommendation = book.recommend(&reading, &context);
    info!(source = %recommendation.source, crops = ?recommendation.crops, "Recommendation made");

    let profile = config.thresholds.profile(&reading);
    let plan = area.map(|area| plan(&profile, &config.dosage, area));

    let report = RecommendReport {
        reading: &reading,
        context: &context,
        recommendation: &recommendation,
        profile: &profile,
        plan: plan.as_ref(),
    };
    let content = match args.format {
        OutputFormat::Json => as_json(&report)?,
        OutputFormat::Text => format_recommendation_text(&report),
    };
    write_output(output, &content)
}
