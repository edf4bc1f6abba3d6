//! Crop rule engine.
//!
//! A [`RuleBook`] is an ordered list of [`CropRule`]s plus a
//! [`DefaultRecommendation`]. [`RuleBook::recommend`] walks the rules in
//! declared order and returns the crops of the first rule whose
//! [`Conditions`] are all satisfied; when none match, the default is
//! returned. There is no scoring and no aggregation across rules.
//!
//! Rule tables are plain serde data. Condition keys are matched strictly,
//! so a misspelled bound such as `pMIn` fails at load time instead of
//! silently leaving the rule unconstrained.
//!
//! # Example
//!
//! ```
//! use soilsense_core::{RecommendationContext, RuleBook, SensorReading};
//!
//! let book = RuleBook::builtin();
//! let reading = SensorReading {
//!     ph: 6.5,
//!     moisture: 55.0,
//!     tds: 0.0,
//!     nitrogen: 60.0,
//!     phosphorus: 35.0,
//!     potassium: 55.0,
//! };
//! let context = RecommendationContext::new("rainy", "kharif");
//!
//! let result = book.recommend(&reading, &context);
//! assert_eq!(result.crops, vec!["Rice", "Paddy"]);
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use soilsense_types::SensorReading;

use crate::error::{Error, Result};

/// Allowed season and weather values.
///
/// Shared by whatever collects the user's context and by
/// [`RuleBook::validate`], so both agree on the same names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub seasons: Vec<String>,
    pub weathers: Vec<String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            seasons: names(&["kharif", "rabi", "zaid"]),
            weathers: names(&["sunny", "rainy", "humid", "dry", "cold", "hot"]),
        }
    }
}

impl Vocabulary {
    /// Whether `season` is a known season.
    pub fn has_season(&self, season: &str) -> bool {
        contains(&self.seasons, season)
    }

    /// Whether `weather` is a known weather condition.
    pub fn has_weather(&self, weather: &str) -> bool {
        contains(&self.weathers, weather)
    }

    /// Reject a context whose values are not in the vocabulary.
    pub fn check_context(&self, context: &RecommendationContext) -> Result<()> {
        if !self.has_season(&context.season) {
            return Err(Error::invalid_config(format!(
                "unknown season '{}' (expected one of: {})",
                context.season,
                self.seasons.join(", ")
            )));
        }
        if !self.has_weather(&context.weather) {
            return Err(Error::invalid_config(format!(
                "unknown weather '{}' (expected one of: {})",
                context.weather,
                self.weathers.join(", ")
            )));
        }
        Ok(())
    }
}

/// User-supplied context a reading is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationContext {
    pub weather: String,
    pub season: String,
}

impl RecommendationContext {
    pub fn new(weather: impl Into<String>, season: impl Into<String>) -> Self {
        Self {
            weather: weather.into(),
            season: season.into(),
        }
    }
}

/// Condition set of one rule. Absent bounds and sets always match.
///
/// Numeric bounds are inclusive on both ends. Weather and season sets
/// match case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Conditions {
    #[serde(rename = "pHMin", skip_serializing_if = "Option::is_none")]
    pub ph_min: Option<f32>,
    #[serde(rename = "pHMax", skip_serializing_if = "Option::is_none")]
    pub ph_max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moisture_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moisture_max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k_min: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k_max: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<Vec<String>>,
}

impl Conditions {
    /// Whether every present constraint is satisfied.
    pub fn matches(&self, reading: &SensorReading, context: &RecommendationContext) -> bool {
        within(reading.ph, self.ph_min, self.ph_max)
            && within(reading.moisture, self.moisture_min, self.moisture_max)
            && within(reading.nitrogen, self.n_min, self.n_max)
            && within(reading.phosphorus, self.p_min, self.p_max)
            && within(reading.potassium, self.k_min, self.k_max)
            && allows(self.weather.as_deref(), &context.weather)
            && allows(self.season.as_deref(), &context.season)
    }

    fn bounds(&self) -> [(&'static str, Option<f32>, Option<f32>); 5] {
        [
            ("pH", self.ph_min, self.ph_max),
            ("moisture", self.moisture_min, self.moisture_max),
            ("n", self.n_min, self.n_max),
            ("p", self.p_min, self.p_max),
            ("k", self.k_min, self.k_max),
        ]
    }
}

fn within(value: f32, min: Option<f32>, max: Option<f32>) -> bool {
    min.is_none_or(|min| value >= min) && max.is_none_or(|max| value <= max)
}

fn allows(set: Option<&[String]>, value: &str) -> bool {
    set.is_none_or(|set| contains(set, value))
}

fn contains(set: &[String], value: &str) -> bool {
    set.iter().any(|item| item.eq_ignore_ascii_case(value))
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// One entry of the ordered rule list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CropRule {
    /// Stable identifier used in diagnostics.
    pub id: String,
    /// Recommended crop names.
    pub crops: Vec<String>,
    /// Localized variants of `crops`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub localized: Vec<String>,
    #[serde(default)]
    pub conditions: Conditions,
}

impl CropRule {
    pub fn new(id: &str, crops: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            crops: names(crops),
            localized: Vec::new(),
            conditions: Conditions::default(),
        }
    }

    #[must_use]
    pub fn localized(mut self, localized: &[&str]) -> Self {
        self.localized = names(localized);
        self
    }

    #[must_use]
    pub fn conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = conditions;
        self
    }
}

/// Crops returned when no rule matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultRecommendation {
    pub crops: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub localized: Vec<String>,
}

/// Which entry of the rule book produced a [`Recommendation`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationSource {
    /// A rule matched.
    Rule {
        /// Position in declared order.
        index: usize,
        id: String,
    },
    /// Nothing matched.
    Default,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rule { index, id } => write!(f, "rule #{index} ({id})"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Result of [`RuleBook::recommend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub crops: Vec<String>,
    pub localized: Vec<String>,
    pub source: RecommendationSource,
}

impl Recommendation {
    /// Whether the default recommendation was used.
    pub fn is_default(&self) -> bool {
        self.source == RecommendationSource::Default
    }
}

/// Ordered crop rules plus the default recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleBook {
    #[serde(default)]
    pub rules: Vec<CropRule>,
    pub default: DefaultRecommendation,
}

impl Default for RuleBook {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RuleBook {
    pub fn new(rules: Vec<CropRule>, default: DefaultRecommendation) -> Self {
        Self { rules, default }
    }

    /// The rule table shipped with the crate.
    pub fn builtin() -> Self {
        crate::catalog::builtin()
    }

    /// Parse a rule table from JSON.
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::invalid_config(format!("invalid rule table: {e}")))
    }

    /// Recommend crops for `reading` in `context`.
    ///
    /// Returns the first matching rule's crops, or the default when no rule
    /// matches. Never fails.
    pub fn recommend(
        &self,
        reading: &SensorReading,
        context: &RecommendationContext,
    ) -> Recommendation {
        self.rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.conditions.matches(reading, context))
            .map(|(index, rule)| Recommendation {
                crops: rule.crops.clone(),
                localized: rule.localized.clone(),
                source: RecommendationSource::Rule {
                    index,
                    id: rule.id.clone(),
                },
            })
            .unwrap_or_else(|| Recommendation {
                crops: self.default.crops.clone(),
                localized: self.default.localized.clone(),
                source: RecommendationSource::Default,
            })
    }

    /// Indices of every rule matching `reading` in `context`, in order.
    ///
    /// Diagnostic only: [`RuleBook::recommend`] still uses just the first.
    pub fn matching_rules(
        &self,
        reading: &SensorReading,
        context: &RecommendationContext,
    ) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| rule.conditions.matches(reading, context))
            .map(|(index, _)| index)
            .collect()
    }

    /// Check the table for authoring mistakes.
    pub fn validate(&self, vocabulary: &Vocabulary) -> Result<()> {
        if self.default.crops.is_empty() {
            return Err(Error::invalid_config(
                "default recommendation must name at least one crop",
            ));
        }

        let mut seen = HashSet::new();
        for (index, rule) in self.rules.iter().enumerate() {
            if !seen.insert(rule.id.as_str()) {
                return Err(Error::invalid_rule(
                    index,
                    format!("duplicate id '{}'", rule.id),
                ));
            }
            if rule.crops.is_empty() {
                return Err(Error::invalid_rule(index, "crop set is empty"));
            }

            let conditions = &rule.conditions;
            for (name, min, max) in conditions.bounds() {
                if let (Some(min), Some(max)) = (min, max)
                    && min > max
                {
                    return Err(Error::invalid_rule(
                        index,
                        format!("{name} bounds are inverted ({min} > {max})"),
                    ));
                }
            }

            if let Some(weather) = &conditions.weather {
                if weather.is_empty() {
                    return Err(Error::invalid_rule(index, "weather set is empty"));
                }
                if let Some(unknown) = weather.iter().find(|w| !vocabulary.has_weather(w)) {
                    return Err(Error::invalid_rule(
                        index,
                        format!("unknown weather '{unknown}'"),
                    ));
                }
            }
            if let Some(season) = &conditions.season {
                if season.is_empty() {
                    return Err(Error::invalid_rule(index, "season set is empty"));
                }
                if let Some(unknown) = season.iter().find(|s| !vocabulary.has_season(s)) {
                    return Err(Error::invalid_rule(
                        index,
                        format!("unknown season '{unknown}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ph: f32, moisture: f32, n: f32, p: f32, k: f32) -> SensorReading {
        SensorReading {
            ph,
            moisture,
            tds: 0.0,
            nitrogen: n,
            phosphorus: p,
            potassium: k,
        }
    }

    fn default_only() -> DefaultRecommendation {
        DefaultRecommendation {
            crops: names(&["Millet", "Sorghum"]),
            localized: Vec::new(),
        }
    }

    #[test]
    fn test_rice_scenario() {
        let book = RuleBook::builtin();
        let result = book.recommend(
            &reading(6.5, 55.0, 60.0, 35.0, 55.0),
            &RecommendationContext::new("rainy", "kharif"),
        );
        assert_eq!(result.crops, vec!["Rice", "Paddy"]);
        assert_eq!(
            result.source,
            RecommendationSource::Rule {
                index: 0,
                id: "rice".to_string()
            }
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let conditions = Conditions {
            ph_min: Some(5.5),
            ph_max: Some(7.5),
            moisture_min: Some(50.0),
            ..Default::default()
        };
        let ctx = RecommendationContext::new("sunny", "rabi");
        assert!(conditions.matches(&reading(5.5, 50.0, 0.0, 0.0, 0.0), &ctx));
        assert!(conditions.matches(&reading(7.5, 50.0, 0.0, 0.0, 0.0), &ctx));
        assert!(!conditions.matches(&reading(7.51, 50.0, 0.0, 0.0, 0.0), &ctx));
        assert!(!conditions.matches(&reading(6.0, 49.9, 0.0, 0.0, 0.0), &ctx));
    }

    #[test]
    fn test_empty_conditions_always_match() {
        let conditions = Conditions::default();
        let ctx = RecommendationContext::new("anything", "whatever");
        assert!(conditions.matches(&reading(0.0, 0.0, 0.0, 0.0, 0.0), &ctx));
    }

    #[test]
    fn test_set_membership_ignores_case() {
        let conditions = Conditions {
            weather: Some(names(&["rainy", "humid"])),
            season: Some(names(&["kharif"])),
            ..Default::default()
        };
        let r = reading(0.0, 0.0, 0.0, 0.0, 0.0);
        assert!(conditions.matches(&r, &RecommendationContext::new("Rainy", "KHARIF")));
        assert!(!conditions.matches(&r, &RecommendationContext::new("dry", "kharif")));
        assert!(!conditions.matches(&r, &RecommendationContext::new("humid", "rabi")));
    }

    #[test]
    fn test_first_match_wins() {
        let book = RuleBook::new(
            vec![
                CropRule::new("first", &["Barley"]),
                CropRule::new("second", &["Oats"]),
            ],
            default_only(),
        );
        let r = reading(6.0, 40.0, 10.0, 10.0, 10.0);
        let ctx = RecommendationContext::new("cold", "rabi");

        assert_eq!(book.recommend(&r, &ctx).crops, vec!["Barley"]);
        assert_eq!(book.matching_rules(&r, &ctx), vec![0, 1]);
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let book = RuleBook::new(
            vec![CropRule::new("wet", &["Taro"]).conditions(Conditions {
                moisture_min: Some(90.0),
                ..Default::default()
            })],
            default_only(),
        );
        let result = book.recommend(
            &reading(0.0, 10.0, 0.0, 0.0, 0.0),
            &RecommendationContext::new("dry", "zaid"),
        );
        assert!(result.is_default());
        assert_eq!(result.crops, vec!["Millet", "Sorghum"]);
    }

    #[test]
    fn test_empty_book_returns_default() {
        let book = RuleBook::new(Vec::new(), default_only());
        let result = book.recommend(
            &reading(6.5, 55.0, 60.0, 35.0, 55.0),
            &RecommendationContext::new("rainy", "kharif"),
        );
        assert_eq!(result.source, RecommendationSource::Default);
    }

    #[test]
    fn test_recommend_is_deterministic() {
        let book = RuleBook::builtin();
        let r = reading(6.8, 45.0, 35.0, 22.0, 30.0);
        let ctx = RecommendationContext::new("cold", "rabi");
        let first = book.recommend(&r, &ctx);
        for _ in 0..10 {
            assert_eq!(book.recommend(&r, &ctx), first);
        }
    }

    #[test]
    fn test_misspelled_key_rejected_at_load() {
        let json = r#"{
            "rules": [{"id": "x", "crops": ["Jute"], "conditions": {"pMIn": 20}}],
            "default": {"crops": ["Millet"]}
        }"#;
        let err = RuleBook::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
        assert!(err.to_string().contains("pMIn"));
    }

    #[test]
    fn test_source_key_names() {
        let json = r#"{
            "rules": [{
                "id": "rice",
                "crops": ["Rice"],
                "conditions": {"pHMin": 5.5, "pHMax": 7.5, "nMin": 40, "kMax": 80,
                               "moistureMin": 50, "weather": ["rainy"]}
            }],
            "default": {"crops": ["Millet"]}
        }"#;
        let book = RuleBook::from_json_str(json).unwrap();
        let conditions = &book.rules[0].conditions;
        assert_eq!(conditions.ph_min, Some(5.5));
        assert_eq!(conditions.ph_max, Some(7.5));
        assert_eq!(conditions.n_min, Some(40.0));
        assert_eq!(conditions.k_max, Some(80.0));
        assert_eq!(conditions.moisture_min, Some(50.0));
        assert!(conditions.season.is_none());
    }

    #[test]
    fn test_builtin_is_valid() {
        RuleBook::builtin().validate(&Vocabulary::default()).unwrap();
    }

    #[test]
    fn test_validate_rejects_authoring_mistakes() {
        let vocab = Vocabulary::default();

        let empty_crops = RuleBook::new(vec![CropRule::new("none", &[])], default_only());
        assert!(matches!(
            empty_crops.validate(&vocab),
            Err(Error::InvalidRule { index: 0, .. })
        ));

        let inverted = RuleBook::new(
            vec![
                CropRule::new("ok", &["Barley"]),
                CropRule::new("bad", &["Oats"]).conditions(Conditions {
                    n_min: Some(50.0),
                    n_max: Some(10.0),
                    ..Default::default()
                }),
            ],
            default_only(),
        );
        assert!(matches!(
            inverted.validate(&vocab),
            Err(Error::InvalidRule { index: 1, .. })
        ));

        let unknown_season = RuleBook::new(
            vec![CropRule::new("x", &["Barley"]).conditions(Conditions {
                season: Some(names(&["monsoon"])),
                ..Default::default()
            })],
            default_only(),
        );
        let err = unknown_season.validate(&vocab).unwrap_err();
        assert!(err.to_string().contains("monsoon"));

        let empty_weather = RuleBook::new(
            vec![CropRule::new("x", &["Barley"]).conditions(Conditions {
                weather: Some(Vec::new()),
                ..Default::default()
            })],
            default_only(),
        );
        assert!(empty_weather.validate(&vocab).is_err());

        let duplicate = RuleBook::new(
            vec![
                CropRule::new("x", &["Barley"]),
                CropRule::new("x", &["Oats"]),
            ],
            default_only(),
        );
        assert!(duplicate.validate(&vocab).is_err());

        let no_default = RuleBook::new(
            Vec::new(),
            DefaultRecommendation {
                crops: Vec::new(),
                localized: Vec::new(),
            },
        );
        assert!(matches!(
            no_default.validate(&vocab),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_vocabulary_checks_context() {
        let vocab = Vocabulary::default();
        assert!(vocab.check_context(&RecommendationContext::new("rainy", "kharif")).is_ok());
        assert!(vocab.check_context(&RecommendationContext::new("foggy", "kharif")).is_err());
        assert!(vocab.check_context(&RecommendationContext::new("rainy", "winter")).is_err());
    }

    #[test]
    fn test_recommendation_serializes_source() {
        let rec = Recommendation {
            crops: names(&["Rice"]),
            localized: Vec::new(),
            source: RecommendationSource::Rule {
                index: 0,
                id: "rice".to_string(),
            },
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["source"]["kind"], "rule");
        assert_eq!(json["source"]["id"], "rice");
    }
}
