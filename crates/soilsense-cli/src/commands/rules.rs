//! Rules command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use soilsense_core::RecommendationContext;

use crate::cli::{OutputFormat, ReadingArgs};
use crate::config::Config;
use crate::format::{ExplainReport, as_json, format_explain_text, format_rules_text};
use crate::util::write_output;

/// Arguments for the rules command
pub struct RulesArgs {
    pub file: Option<PathBuf>,
    pub explain: bool,
    pub reading: ReadingArgs,
    pub season: Option<String>,
    pub weather: Option<String>,
    pub format: OutputFormat,
}

pub fn cmd_rules(config: &Config, args: RulesArgs, output: Option<&PathBuf>) -> Result<()> {
    let book = config.rule_book(args.file.as_deref())?;

    if !args.explain {
        let content = match args.format {
            OutputFormat::Json => as_json(&book)?,
            OutputFormat::Text => format_rules_text(&book),
        };
        return write_output(output, &content);
    }

    let reading = args
        .reading
        .reading()
        .context("--explain needs --moisture and --ec")?;
    let (Some(season), Some(weather)) = (&args.season, &args.weather) else {
        anyhow::bail!("--explain needs --season and --weather");
    };
    let context =
        RecommendationContext::new(weather.trim().to_lowercase(), season.trim().to_lowercase());
    config.vocabulary.check_context(&context)?;

    let matching_rules = book
        .matching_rules(&reading, &context)
        .into_iter()
        .filter_map(|index| book.rules.get(index).map(|rule| rule.id.as_str()))
        .collect();
    let recommendation = book.recommend(&reading, &context);

    let report = ExplainReport {
        reading: &reading,
        context: &context,
        matching_rules,
        recommendation: &recommendation,
    };
    let content = match args.format {
        OutputFormat::Json => as_json(&report)?,
        OutputFormat::Text => format_explain_text(&report),
    };
    write_output(output, &content)
}
