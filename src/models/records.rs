//! Static reference records: trees, species, municipalities and the pollutant-impact table.
//!
//! These arrive from external stores as loosely-typed rows; every descriptive field is
//! optional so that a partially filled record still deserializes.

use super::Coordinates;
use serde::{Deserialize, Serialize};

/// A monumental tree as registered in the national catalogue.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TreeRecord {
    pub id: String,
    pub nickname: Option<String>,
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub height_m: Option<f64>,
    pub circumference_cm: Option<f64>,
    pub crown_diameter_m: Option<f64>,
    #[serde(default)]
    pub coordinates: Coordinates,
    pub municipality: Option<String>,
    pub province: Option<String>,
    pub region: Option<String>,
    /// Free-text age descriptor, e.g. "oltre 300 anni".
    pub age: Option<String>,
    pub health_status: Option<String>,
    pub historical_notes: Option<String>,
    pub monumental_criteria: Option<String>,
}

impl TreeRecord {
    /// The most human-friendly name available, nickname first.
    pub fn display_name(&self) -> Option<&str> {
        non_blank(&self.nickname)
            .or_else(|| non_blank(&self.common_name))
            .or_else(|| non_blank(&self.scientific_name))
    }
}

/// A quantity with its unit, e.g. `20 kg/anno`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }
}

/// Yearly pollutant abatement attributed to one tree of a species.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AbatementValues {
    pub co2: Option<Quantity>,
    pub pm10: Option<Quantity>,
    pub o3: Option<Quantity>,
    pub no2: Option<Quantity>,
    pub so2: Option<Quantity>,
}

impl AbatementValues {
    /// Set abatement fields paired with the pollutant code used by the impact table.
    pub fn present(&self) -> Vec<(&'static str, &Quantity)> {
        [
            ("CO₂", &self.co2),
            ("PM10", &self.pm10),
            ("O₃", &self.o3),
            ("NO₂", &self.no2),
            ("SO₂", &self.so2),
        ]
        .into_iter()
        .filter_map(|(code, value)| value.as_ref().map(|q| (code, q)))
        .collect()
    }
}

/// Botanical data about a tree species.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpeciesRecord {
    pub scientific_name: Option<String>,
    pub common_name: Option<String>,
    pub family: Option<String>,
    /// Evergreen or deciduous habit, as free text.
    pub leaf_habit: Option<String>,
    pub flowering_period: Option<String>,
    pub max_height_m: Option<f64>,
    pub longevity: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub abatement: AbatementValues,
}

/// Reference data about an Italian municipality.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocationRecord {
    pub municipality: String,
    pub province: Option<String>,
    pub region: Option<String>,
    pub population: Option<u64>,
    pub area_km2: Option<f64>,
    pub altitude_m: Option<f64>,
    pub history: Option<String>,
    pub culture: Option<String>,
}

/// One row of the ecological impact table.
///
/// `reference_value` and `dependency_quantity` are free text ("10 kg", "5 giorni") and are
/// parsed lazily when a sentence is generated; a row that fails to parse is skipped.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PollutantRecord {
    pub pollutant_code: String,
    pub reference_value: String,
    /// Unit of `reference_value`, used when the value string carries none.
    #[serde(default)]
    pub unit: String,
    pub dependency_quantity: String,
    #[serde(default)]
    pub dependency_unit: String,
    #[serde(default)]
    pub time_span: String,
    /// Sentence with `{$valore}`, `{$dipendenza}` and `{$tempo}` placeholders.
    pub description_template: String,
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
