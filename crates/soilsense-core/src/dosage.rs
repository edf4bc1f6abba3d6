//! Fertilizer dosage planning.
//!
//! Turns a [`SoilProfile`] into kilograms of N, P and K for a plot of land.
//! Low bands get the full corrective rate, Medium bands a maintenance rate,
//! High bands nothing. Moisture is banded but never fertilized.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::thresholds::{Band, Nutrient, SoilProfile};

const HECTARES_PER_ACRE: f64 = 0.404_685_642_24;
const HECTARES_PER_SQUARE_METER: f64 = 0.000_1;

/// Unit a land area is entered in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaUnit {
    #[default]
    Acre,
    Hectare,
    SquareMeter,
}

impl AreaUnit {
    fn hectares_per_unit(self) -> f64 {
        match self {
            AreaUnit::Acre => HECTARES_PER_ACRE,
            AreaUnit::Hectare => 1.0,
            AreaUnit::SquareMeter => HECTARES_PER_SQUARE_METER,
        }
    }
}

impl fmt::Display for AreaUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AreaUnit::Acre => write!(f, "acre"),
            AreaUnit::Hectare => write!(f, "hectare"),
            AreaUnit::SquareMeter => write!(f, "m²"),
        }
    }
}

/// A plot size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandArea {
    pub value: f64,
    pub unit: AreaUnit,
}

impl LandArea {
    /// Create an area. Rejects negative and non-finite values.
    pub fn new(value: f64, unit: AreaUnit) -> Result<Self> {
        if !value.is_finite() || value < 0.0 {
            return Err(Error::invalid_config(format!(
                "land area must be a non-negative number, got {value}"
            )));
        }
        Ok(Self { value, unit })
    }

    pub fn to_hectares(&self) -> f64 {
        self.value * self.unit.hectares_per_unit()
    }
}

impl fmt::Display for LandArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Application rates for one nutrient, in kg/ha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseRates {
    /// Rate for a Low band.
    pub full: f64,
    /// Rate for a Medium band.
    pub maintenance: f64,
}

impl DoseRates {
    pub const fn new(full: f64, maintenance: f64) -> Self {
        Self { full, maintenance }
    }

    /// Rate for `band` in kg/ha.
    pub fn rate_for(&self, band: Band) -> f64 {
        match band {
            Band::Low => self.full,
            Band::Medium => self.maintenance,
            Band::High => 0.0,
        }
    }
}

/// Dose rates per nutrient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DosageTable {
    pub nitrogen: DoseRates,
    pub phosphorus: DoseRates,
    pub potassium: DoseRates,
}

impl Default for DosageTable {
    fn default() -> Self {
        Self {
            nitrogen: DoseRates::new(120.0, 60.0),
            phosphorus: DoseRates::new(60.0, 30.0),
            potassium: DoseRates::new(60.0, 30.0),
        }
    }
}

impl DosageTable {
    /// Rates for a fertilized nutrient; `None` for moisture.
    pub fn rates(&self, nutrient: Nutrient) -> Option<&DoseRates> {
        match nutrient {
            Nutrient::Nitrogen => Some(&self.nitrogen),
            Nutrient::Phosphorus => Some(&self.phosphorus),
            Nutrient::Potassium => Some(&self.potassium),
            Nutrient::Moisture => None,
        }
    }

    /// Reject negative rates and a maintenance rate above the full rate.
    pub fn validate(&self) -> Result<()> {
        for nutrient in Nutrient::ALL {
            let Some(rates) = self.rates(nutrient) else {
                continue;
            };
            if rates.full < 0.0 || rates.maintenance < 0.0 {
                return Err(Error::invalid_config(format!(
                    "{nutrient} dose rates must not be negative"
                )));
            }
            if rates.maintenance > rates.full {
                return Err(Error::invalid_config(format!(
                    "{nutrient} maintenance rate exceeds full rate ({} > {})",
                    rates.maintenance, rates.full
                )));
            }
        }
        Ok(())
    }
}

/// One nutrient line of a [`FertilizerPlan`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseLine {
    pub nutrient: Nutrient,
    pub band: Band,
    pub rate_kg_per_ha: f64,
    pub total_kg: f64,
}

/// Fertilizer quantities for one plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FertilizerPlan {
    pub area: LandArea,
    pub hectares: f64,
    pub lines: Vec<DoseLine>,
}

impl FertilizerPlan {
    /// Total kilograms across all nutrients.
    pub fn total_kg(&self) -> f64 {
        self.lines.iter().map(|line| line.total_kg).sum()
    }

    /// The line for `nutrient`, if it is fertilized.
    pub fn line(&self, nutrient: Nutrient) -> Option<&DoseLine> {
        self.lines.iter().find(|line| line.nutrient == nutrient)
    }
}

/// Compute how much of each nutrient to apply to `area`.
pub fn plan(profile: &SoilProfile, table: &DosageTable, area: LandArea) -> FertilizerPlan {
    let hectares = area.to_hectares();
    let lines = Nutrient::ALL
        .into_iter()
        .filter_map(|nutrient| {
            let rates = table.rates(nutrient)?;
            let band = profile.band(nutrient);
            let rate = rates.rate_for(band);
            Some(DoseLine {
                nutrient,
                band,
                rate_kg_per_ha: rate,
                total_kg: rate * hectares,
            })
        })
        .collect();

    FertilizerPlan {
        area,
        hectares,
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(n: Band, p: Band, k: Band) -> SoilProfile {
        SoilProfile {
            nitrogen: n,
            phosphorus: p,
            potassium: k,
            moisture: Band::Low,
            ph: None,
        }
    }

    #[test]
    fn test_area_conversion() {
        let acre = LandArea::new(1.0, AreaUnit::Acre).unwrap();
        assert!((acre.to_hectares() - 0.404_685_642_24).abs() < 1e-12);

        let ha = LandArea::new(2.5, AreaUnit::Hectare).unwrap();
        assert_eq!(ha.to_hectares(), 2.5);

        let sqm = LandArea::new(10_000.0, AreaUnit::SquareMeter).unwrap();
        assert!((sqm.to_hectares() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_rejects_bad_values() {
        assert!(LandArea::new(-1.0, AreaUnit::Hectare).is_err());
        assert!(LandArea::new(f64::NAN, AreaUnit::Acre).is_err());
        assert!(LandArea::new(0.0, AreaUnit::Acre).is_ok());
    }

    #[test]
    fn test_plan_by_band() {
        let table = DosageTable::default();
        let area = LandArea::new(2.0, AreaUnit::Hectare).unwrap();
        let plan = plan(&profile(Band::Low, Band::Medium, Band::High), &table, area);

        assert_eq!(plan.lines.len(), 3);
        assert_eq!(plan.line(Nutrient::Nitrogen).unwrap().total_kg, 240.0);
        assert_eq!(plan.line(Nutrient::Phosphorus).unwrap().total_kg, 60.0);
        assert_eq!(plan.line(Nutrient::Potassium).unwrap().total_kg, 0.0);
        assert!(plan.line(Nutrient::Moisture).is_none());
        assert_eq!(plan.total_kg(), 300.0);
    }

    #[test]
    fn test_dosage_validation() {
        assert!(DosageTable::default().validate().is_ok());

        let mut table = DosageTable::default();
        table.potassium = DoseRates::new(20.0, 40.0);
        assert!(table.validate().is_err());

        table.potassium = DoseRates::new(-1.0, 0.0);
        assert!(table.validate().is_err());
    }
}
