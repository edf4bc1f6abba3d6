//! Soil parameter thresholds and banding.
//!
//! This module buckets the nutrient and moisture channels of a
//! [`SensorReading`] into qualitative [`Band`]s and positions pH against its
//! agronomic range.
//!
//! A value equal to a cut point belongs to the higher band.
//!
//! # Example
//!
//! ```
//! use soilsense_core::{Band, Nutrient, ThresholdTable};
//!
//! let table = ThresholdTable::default();
//!
//! assert_eq!(table.classify(Nutrient::Nitrogen, 19.0), Band::Low);
//! assert_eq!(table.classify(Nutrient::Nitrogen, 20.0), Band::Medium);
//! assert_eq!(table.classify(Nutrient::Nitrogen, 40.0), Band::High);
//!
//! println!("{}", Band::Low.action());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use soilsense_types::SensorReading;

use crate::error::{Error, Result};

/// Qualitative level of a banded soil parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    /// Below the `low` cut point.
    Low,
    /// At or above `low`, below `medium`.
    Medium,
    /// At or above `medium`.
    High,
}

impl Band {
    /// Get the suggested action for a nutrient at this level.
    pub fn action(&self) -> &'static str {
        match self {
            Band::Low => "Apply a full corrective dose",
            Band::Medium => "Apply a maintenance dose",
            Band::High => "No application needed",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Low => write!(f, "Low"),
            Band::Medium => write!(f, "Medium"),
            Band::High => write!(f, "High"),
        }
    }
}

/// A soil parameter classified by cut points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Nutrient {
    Nitrogen,
    Phosphorus,
    Potassium,
    Moisture,
}

impl Nutrient {
    /// All banded parameters in display order.
    pub const ALL: [Nutrient; 4] = [
        Nutrient::Nitrogen,
        Nutrient::Phosphorus,
        Nutrient::Potassium,
        Nutrient::Moisture,
    ];

    /// Read this parameter from a reading.
    pub fn value_in(&self, reading: &SensorReading) -> f32 {
        match self {
            Nutrient::Nitrogen => reading.nitrogen,
            Nutrient::Phosphorus => reading.phosphorus,
            Nutrient::Potassium => reading.potassium,
            Nutrient::Moisture => reading.moisture,
        }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nutrient::Nitrogen => write!(f, "Nitrogen"),
            Nutrient::Phosphorus => write!(f, "Phosphorus"),
            Nutrient::Potassium => write!(f, "Potassium"),
            Nutrient::Moisture => write!(f, "Moisture"),
        }
    }
}

/// Ordered cut points for one banded parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CutPoints {
    /// Lower edge of the Medium band.
    pub low: f32,
    /// Lower edge of the High band.
    pub medium: f32,
    /// Top of the reference scale.
    pub high: f32,
}

impl CutPoints {
    /// Create cut points.
    pub const fn new(low: f32, medium: f32, high: f32) -> Self {
        Self { low, medium, high }
    }

    /// Bucket `value` into a band.
    pub fn band(&self, value: f32) -> Band {
        if value < self.low {
            Band::Low
        } else if value < self.medium {
            Band::Medium
        } else {
            Band::High
        }
    }

    fn is_ordered(&self) -> bool {
        self.low <= self.medium && self.medium <= self.high
    }
}

/// Acceptable pH range and its agronomic optimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhRange {
    pub min: f32,
    pub max: f32,
    pub optimal: f32,
}

/// Where a pH value sits relative to [`PhRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhPosition {
    BelowRange,
    InRange,
    AboveRange,
}

impl fmt::Display for PhPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhPosition::BelowRange => write!(f, "below range"),
            PhPosition::InRange => write!(f, "in range"),
            PhPosition::AboveRange => write!(f, "above range"),
        }
    }
}

/// Result of [`ThresholdTable::assess_ph`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhAssessment {
    pub position: PhPosition,
    /// Absolute distance from the optimal pH.
    pub distance_from_optimal: f32,
}

/// Bands for every classified parameter of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilProfile {
    pub nitrogen: Band,
    pub phosphorus: Band,
    pub potassium: Band,
    pub moisture: Band,
    /// `None` when the reading carries no pH measurement.
    pub ph: Option<PhAssessment>,
}

impl SoilProfile {
    /// Band of a single parameter.
    pub fn band(&self, nutrient: Nutrient) -> Band {
        match nutrient {
            Nutrient::Nitrogen => self.nitrogen,
            Nutrient::Phosphorus => self.phosphorus,
            Nutrient::Potassium => self.potassium,
            Nutrient::Moisture => self.moisture,
        }
    }
}

/// Static threshold configuration.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdTable {
    pub ph: PhRange,
    pub nitrogen: CutPoints,
    pub phosphorus: CutPoints,
    pub potassium: CutPoints,
    pub moisture: CutPoints,
}

impl Default for ThresholdTable {
    fn default() -> Self {
        Self {
            ph: PhRange {
                min: 6.0,
                max: 7.5,
                optimal: 6.5,
            },
            nitrogen: CutPoints::new(20.0, 40.0, 60.0),
            phosphorus: CutPoints::new(15.0, 30.0, 50.0),
            potassium: CutPoints::new(20.0, 40.0, 60.0),
            moisture: CutPoints::new(30.0, 50.0, 70.0),
        }
    }
}

impl ThresholdTable {
    /// Cut points for one parameter.
    pub fn cut_points(&self, nutrient: Nutrient) -> &CutPoints {
        match nutrient {
            Nutrient::Nitrogen => &self.nitrogen,
            Nutrient::Phosphorus => &self.phosphorus,
            Nutrient::Potassium => &self.potassium,
            Nutrient::Moisture => &self.moisture,
        }
    }

    /// Bucket `value` of `nutrient` into a band.
    pub fn classify(&self, nutrient: Nutrient, value: f32) -> Band {
        self.cut_points(nutrient).band(value)
    }

    /// Position `value` against the pH range (inclusive on both ends).
    pub fn assess_ph(&self, value: f32) -> PhAssessment {
        let position = if value < self.ph.min {
            PhPosition::BelowRange
        } else if value > self.ph.max {
            PhPosition::AboveRange
        } else {
            PhPosition::InRange
        };
        PhAssessment {
            position,
            distance_from_optimal: (value - self.ph.optimal).abs(),
        }
    }

    /// Classify every parameter of a reading.
    pub fn profile(&self, reading: &SensorReading) -> SoilProfile {
        SoilProfile {
            nitrogen: self.classify(Nutrient::Nitrogen, reading.nitrogen),
            phosphorus: self.classify(Nutrient::Phosphorus, reading.phosphorus),
            potassium: self.classify(Nutrient::Potassium, reading.potassium),
            moisture: self.classify(Nutrient::Moisture, reading.moisture),
            ph: reading.has_ph().then(|| self.assess_ph(reading.ph)),
        }
    }

    /// Validate the table and return an error if invalid.
    ///
    /// Checks that `min <= optimal <= max` for pH and `low <= medium <= high`
    /// for every banded parameter.
    pub fn validate(&self) -> Result<()> {
        let ph = &self.ph;
        if !(ph.min <= ph.optimal && ph.optimal <= ph.max) {
            return Err(Error::invalid_config(format!(
                "pH thresholds must satisfy min <= optimal <= max (got {} / {} / {})",
                ph.min, ph.optimal, ph.max
            )));
        }
        for nutrient in Nutrient::ALL {
            let cuts = self.cut_points(nutrient);
            if !cuts.is_ordered() {
                return Err(Error::invalid_config(format!(
                    "{} thresholds must satisfy low <= medium <= high (got {} / {} / {})",
                    nutrient, cuts.low, cuts.medium, cuts.high
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries_promote() {
        let t = ThresholdTable::default();
        assert_eq!(t.classify(Nutrient::Phosphorus, 14.9), Band::Low);
        assert_eq!(t.classify(Nutrient::Phosphorus, 15.0), Band::Medium);
        assert_eq!(t.classify(Nutrient::Phosphorus, 29.9), Band::Medium);
        assert_eq!(t.classify(Nutrient::Phosphorus, 30.0), Band::High);
        assert_eq!(t.classify(Nutrient::Phosphorus, 50.0), Band::High);
        assert_eq!(t.classify(Nutrient::Phosphorus, 500.0), Band::High);
    }

    #[test]
    fn test_every_cut_point_is_promoted() {
        let t = ThresholdTable::default();
        for nutrient in Nutrient::ALL {
            let cuts = *t.cut_points(nutrient);
            assert_eq!(t.classify(nutrient, cuts.low), Band::Medium, "{nutrient}");
            assert_eq!(t.classify(nutrient, cuts.medium), Band::High, "{nutrient}");
            assert_eq!(t.classify(nutrient, cuts.high), Band::High, "{nutrient}");
        }
    }

    #[test]
    fn test_zero_is_low() {
        let t = ThresholdTable::default();
        for nutrient in Nutrient::ALL {
            assert_eq!(t.classify(nutrient, 0.0), Band::Low);
        }
    }

    #[test]
    fn test_ph_assessment() {
        let t = ThresholdTable::default();

        let below = t.assess_ph(5.5);
        assert_eq!(below.position, PhPosition::BelowRange);
        assert!((below.distance_from_optimal - 1.0).abs() < 1e-6);

        assert_eq!(t.assess_ph(6.0).position, PhPosition::InRange);
        assert_eq!(t.assess_ph(7.5).position, PhPosition::InRange);
        assert_eq!(t.assess_ph(7.6).position, PhPosition::AboveRange);

        let optimal = t.assess_ph(6.5);
        assert_eq!(optimal.position, PhPosition::InRange);
        assert_eq!(optimal.distance_from_optimal, 0.0);
    }

    #[test]
    fn test_profile_from_decoded_reading() {
        let t = ThresholdTable::default();
        let reading = soilsense_types::decode(&[42, 17]).unwrap();
        let profile = t.profile(&reading);

        assert_eq!(profile.moisture, Band::Medium);
        assert_eq!(profile.nitrogen, Band::Low);
        assert_eq!(profile.phosphorus, Band::Medium);
        assert_eq!(profile.potassium, Band::Low);
        assert!(profile.ph.is_none());
        assert_eq!(profile.band(Nutrient::Moisture), Band::Medium);
    }

    #[test]
    fn test_profile_with_ph() {
        let t = ThresholdTable::default();
        let reading = soilsense_types::decode(&[55, 45]).unwrap().with_ph(8.0);
        let profile = t.profile(&reading);

        assert_eq!(profile.ph.map(|p| p.position), Some(PhPosition::AboveRange));
        assert_eq!(profile.nitrogen, Band::High);
    }

    #[test]
    fn test_validate() {
        assert!(ThresholdTable::default().validate().is_ok());

        let mut bad_ph = ThresholdTable::default();
        bad_ph.ph.optimal = 8.0;
        assert!(matches!(bad_ph.validate(), Err(Error::InvalidConfig(_))));

        let mut bad_cuts = ThresholdTable::default();
        bad_cuts.potassium = CutPoints::new(40.0, 20.0, 60.0);
        let err = bad_cuts.validate().unwrap_err();
        assert!(err.to_string().contains("Potassium"));
    }

    #[test]
    fn test_partial_table_deserializes_with_defaults() {
        let json = r#"{"moisture": {"low": 25.0, "medium": 45.0, "high": 65.0}}"#;
        let table: ThresholdTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.moisture.low, 25.0);
        assert_eq!(table.nitrogen, ThresholdTable::default().nitrogen);
    }

    #[test]
    fn test_band_action() {
        assert_eq!(Band::High.action(), "No application needed");
        assert!(Band::Low < Band::High);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Raising a value never lowers its band.
        #[test]
        fn classify_is_monotonic(a in 0.0f32..255.0, b in 0.0f32..255.0) {
            let t = ThresholdTable::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            for nutrient in Nutrient::ALL {
                prop_assert!(t.classify(nutrient, lo) <= t.classify(nutrient, hi));
            }
        }

        #[test]
        fn ph_distance_is_non_negative(ph in 0.0f32..14.0) {
            let assessment = ThresholdTable::default().assess_ph(ph);
            prop_assert!(assessment.distance_from_optimal >= 0.0);
        }
    }
}
