//! Output formatting for text and JSON.

use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;
use soilsense_core::{
    FertilizerPlan, Nutrient, Recommendation, RecommendationContext, RuleBook, SensorReading,
    Snapshot, SnapshotSource, SoilProfile,
};

/// Serialize value to pretty JSON with a trailing newline.
pub fn as_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)? + "\n")
}

/// Everything `recommend` produces, for JSON output.
#[derive(Debug, Serialize)]
pub struct RecommendReport<'a> {
    pub reading: &'a SensorReading,
    pub context: &'a RecommendationContext,
    pub recommendation: &'a Recommendation,
    pub profile: &'a SoilProfile,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<&'a FertilizerPlan>,
}

/// `classify` output for JSON.
#[derive(Debug, Serialize)]
pub struct ClassifyReport<'a> {
    pub reading: &'a SensorReading,
    pub profile: &'a SoilProfile,
}

/// `rules --explain` output for JSON.
#[derive(Debug, Serialize)]
pub struct ExplainReport<'a> {
    pub reading: &'a SensorReading,
    pub context: &'a RecommendationContext,
    pub matching_rules: Vec<&'a str>,
    pub recommendation: &'a Recommendation,
}

fn reading_lines(out: &mut String, reading: &SensorReading) {
    if reading.has_ph() {
        let _ = writeln!(out, "pH:          {:>5.1}", reading.ph);
    } else {
        let _ = writeln!(out, "pH:            n/a");
    }
    let _ = writeln!(out, "Moisture:    {:>5.0} %", reading.moisture);
    let _ = writeln!(out, "TDS:         {:>5.0}", reading.tds);
    let _ = writeln!(out, "Nitrogen:    {:>5.0}", reading.nitrogen);
    let _ = writeln!(out, "Phosphorus:  {:>5.0}", reading.phosphorus);
    let _ = writeln!(out, "Potassium:   {:>5.0}", reading.potassium);
}

/// Format a snapshot as text.
#[must_use]
pub fn format_snapshot_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    if let Some(name) = &snapshot.device_name {
        let _ = writeln!(out, "Device:      {}", name);
    }
    let source = match snapshot.source {
        SnapshotSource::Notification => "notification",
        SnapshotSource::FallbackRead => "fallback read",
    };
    let _ = writeln!(out, "Source:      {}", source);
    reading_lines(&mut out, &snapshot.reading);
    out
}

/// Format a reading as text.
#[must_use]
pub fn format_reading_text(reading: &SensorReading) -> String {
    let mut out = String::new();
    reading_lines(&mut out, reading);
    out
}

/// Format banded parameters and pH position.
#[must_use]
pub fn format_profile_text(profile: &SoilProfile) -> String {
    let mut out = String::new();
    for nutrient in Nutrient::ALL {
        let band = profile.band(nutrient);
        let _ = writeln!(
            out,
            "{:<12} {:<7} {}",
            format!("{}:", nutrient),
            band.to_string(),
            band.action()
        );
    }
    match &profile.ph {
        Some(ph) => {
            let _ = writeln!(
                out,
                "{:<12} {} ({:.1} from optimal)",
                "pH:", ph.position, ph.distance_from_optimal
            );
        }
        None => {
            let _ = writeln!(out, "{:<12} not measured", "pH:");
        }
    }
    out
}

fn crop_list(crops: &[String], localized: &[String]) -> String {
    if localized.is_empty() {
        crops.join(", ")
    } else {
        format!("{} ({})", crops.join(", "), localized.join(", "))
    }
}

/// Format a fertilizer plan as text.
#[must_use]
pub fn format_plan_text(plan: &FertilizerPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Fertilizer for {} ({:.2} ha):",
        plan.area, plan.hectares
    );
    for line in &plan.lines {
        let _ = writeln!(
            out,
            "  {:<11} {:<7} {:>6.1} kg/ha  {:>8.1} kg",
            line.nutrient.to_string(),
            line.band.to_string(),
            line.rate_kg_per_ha,
            line.total_kg
        );
    }
    let _ = writeln!(out, "  {:<11} {:>33.1} kg", "Total", plan.total_kg());
    out
}

/// Format the full `recommend` output as text.
#[must_use]
pub fn format_recommendation_text(report: &RecommendReport<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Season: {}  Weather: {}",
        report.context.season, report.context.weather
    );
    out.push('\n');
    out.push_str(&format_reading_text(report.reading));
    out.push('\n');
    out.push_str(&format_profile_text(report.profile));
    out.push('\n');

    let rec = report.recommendation;
    let _ = writeln!(
        out,
        "Recommended: {}",
        crop_list(&rec.crops, &rec.localized)
    );
    let _ = writeln!(out, "Matched:     {}", rec.source);

    if let Some(plan) = report.plan {
        out.push('\n');
        out.push_str(&format_plan_text(plan));
    }
    out
}

/// Format the rule table, one rule per line.
#[must_use]
pub fn format_rules_text(book: &RuleBook) -> String {
    let mut out = String::new();
    for (index, rule) in book.rules.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:<10} {}",
            index,
            rule.id,
            crop_list(&rule.crops, &rule.localized)
        );
    }
    let _ = writeln!(
        out,
        " -  {:<10} {}",
        "default",
        crop_list(&book.default.crops, &book.default.localized)
    );
    out
}

/// Format which rules match, marking the one that wins.
#[must_use]
pub fn format_explain_text(report: &ExplainReport<'_>) -> String {
    let mut out = String::new();
    if report.matching_rules.is_empty() {
        let _ = writeln!(out, "No rule matches; the default applies.");
    } else {
        let _ = writeln!(out, "Matching rules (first wins):");
        for (position, id) in report.matching_rules.iter().enumerate() {
            let marker = if position == 0 { "*" } else { " " };
            let _ = writeln!(out, "  {} {}", marker, id);
        }
    }
    let rec = report.recommendation;
    let _ = writeln!(
        out,
        "Recommended: {}",
        crop_list(&rec.crops, &rec.localized)
    );
    out
}
