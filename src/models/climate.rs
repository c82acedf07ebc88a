//! Derived climate summaries and the trend statements computed between them.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// Which period a `ClimateWindow` summarizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Week,
    Year,
    Decade,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WindowKind::Week => "week",
            WindowKind::Year => "year",
            WindowKind::Decade => "decade",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TemperatureStats {
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    pub std_dev: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindStats {
    pub mean: f64,
    pub max: f64,
}

/// Read-only statistical snapshot of one period.
///
/// `precipitation` is the total over the period for week and year windows, and the mean
/// monthly total for the decade window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClimateWindow {
    pub kind: WindowKind,
    pub period_end: Option<NaiveDate>,
    pub sample_count: usize,
    pub temperature: TemperatureStats,
    pub humidity: f64,
    pub precipitation: f64,
    pub wind: WindStats,
    pub pressure: f64,
    /// 0–100, higher is cleaner. Only the week window is scored.
    pub air_quality_score: Option<f64>,
}

impl ClimateWindow {
    /// An all-zero window, useful as a starting point in tests.
    pub fn empty(kind: WindowKind) -> Self {
        Self {
            kind,
            period_end: None,
            sample_count: 0,
            temperature: TemperatureStats::default(),
            humidity: 0.0,
            precipitation: 0.0,
            wind: WindStats::default(),
            pressure: 0.0,
            air_quality_score: None,
        }
    }
}

/// One calendar month of the decade archive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyAggregate {
    pub year: i32,
    pub month: u32,
    pub temperature_mean: Option<f64>,
    pub temperature_max: Option<f64>,
    pub temperature_min: Option<f64>,
    pub humidity_mean: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub wind_mean: Option<f64>,
    pub wind_max: Option<f64>,
    pub pressure_mean: Option<f64>,
}

impl MonthlyAggregate {
    /// A month is usable when at least its mean temperature is known.
    pub fn is_usable(&self) -> bool {
        self.temperature_mean.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendTopic {
    Precipitation,
    Temperature,
}

/// A qualitative comparison between two windows, emitted only past a threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendStatement {
    pub topic: TrendTopic,
    pub window_a: WindowKind,
    pub window_b: WindowKind,
    pub text: String,
}
