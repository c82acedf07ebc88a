//! Cross-window comparison producing qualitative trend statements.
//!
//! Every comparison is a strict signed difference or ratio against a calibration constant.
//! Nothing is emitted when a threshold is not crossed.

use crate::models::{ClimateWindow, TrendStatement, TrendTopic, WindowKind};
use crate::narrative::format_number;
use serde::Serialize;
use tracing::debug;

/// Weeks in a year, used to turn the yearly rain total into a weekly baseline.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Average weeks in a calendar month, used to turn the decade monthly mean into a weekly one.
pub const WEEKS_PER_MONTH: f64 = 365.25 / 12.0 / 7.0;

/// Calibration constants for the trend comparator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendThresholds {
    /// Week rain above this multiple of the yearly weekly average is "much above average".
    pub rain_year_high_ratio: f64,
    /// Week rain below this multiple of the yearly weekly average is "unusually dry".
    pub rain_year_low_ratio: f64,
    pub rain_decade_high_ratio: f64,
    pub rain_decade_low_ratio: f64,
    /// °C difference between week and year mean temperature.
    pub temperature_year_delta: f64,
    /// °C difference between week and decade mean temperature.
    pub temperature_decade_delta: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            rain_year_high_ratio: 3.0,
            rain_year_low_ratio: 0.3,
            rain_decade_high_ratio: 4.0,
            rain_decade_low_ratio: 0.25,
            temperature_year_delta: 4.0,
            temperature_decade_delta: 3.0,
        }
    }
}

/// Compares the week against the year and decade windows.
///
/// Precipitation statements always precede temperature statements; within a topic the
/// year comparison precedes the decade one.
pub fn compare_trends(
    week: &ClimateWindow,
    decade: Option<&ClimateWindow>,
    year: Option<&ClimateWindow>,
    thresholds: &TrendThresholds,
) -> Vec<TrendStatement> {
    let mut statements = Vec::new();

    if let Some(year) = year {
        let weekly_baseline = year.precipitation / WEEKS_PER_YEAR;
        if let Some(ratio) = ratio(week.precipitation, weekly_baseline) {
            if ratio > thresholds.rain_year_high_ratio {
                statements.push(statement(
                    TrendTopic::Precipitation,
                    WindowKind::Year,
                    format!(
                        "Questa settimana è piovuto molto più del solito: {} mm, contro una media di {} mm a settimana nell'ultimo anno.",
                        format_number(week.precipitation, 1),
                        format_number(weekly_baseline, 1)
                    ),
                ));
            } else if ratio < thresholds.rain_year_low_ratio {
                statements.push(statement(
                    TrendTopic::Precipitation,
                    WindowKind::Year,
                    format!(
                        "Questa settimana è stata insolitamente asciutta: nell'ultimo anno cadevano in media {} mm di pioggia a settimana.",
                        format_number(weekly_baseline, 1)
                    ),
                ));
            }
        }
    }

    if let Some(decade) = decade {
        let weekly_baseline = decade.precipitation / WEEKS_PER_MONTH;
        if let Some(ratio) = ratio(week.precipitation, weekly_baseline) {
            if ratio > thresholds.rain_decade_high_ratio {
                statements.push(statement(
                    TrendTopic::Precipitation,
                    WindowKind::Decade,
                    "Rispetto agli ultimi dieci anni, in questo periodo non si ricordano piogge così abbondanti.".to_string(),
                ));
            } else if ratio < thresholds.rain_decade_low_ratio {
                statements.push(statement(
                    TrendTopic::Precipitation,
                    WindowKind::Decade,
                    "Rispetto agli ultimi dieci anni, in questo periodo la pioggia è stata eccezionalmente scarsa.".to_string(),
                ));
            }
        }
    }

    if let Some(year) = year {
        let delta = week.temperature.mean - year.temperature.mean;
        if let Some(text) = temperature_text(delta, thresholds.temperature_year_delta, "della media dell'ultimo anno") {
            statements.push(statement(TrendTopic::Temperature, WindowKind::Year, text));
        }
    }

    if let Some(decade) = decade {
        let delta = week.temperature.mean - decade.temperature.mean;
        if let Some(text) = temperature_text(
            delta,
            thresholds.temperature_decade_delta,
            "di quanto fosse normale in questo periodo negli ultimi dieci anni",
        ) {
            statements.push(statement(TrendTopic::Temperature, WindowKind::Decade, text));
        }
    }

    debug!("Trend comparison produced {} statements", statements.len());
    statements
}

/// `None` when the baseline is zero, negative or not finite.
fn ratio(value: f64, baseline: f64) -> Option<f64> {
    if baseline.is_finite() && baseline > 0.0 {
        Some(value / baseline)
    } else {
        None
    }
}

fn temperature_text(delta: f64, threshold: f64, reference: &str) -> Option<String> {
    if delta > threshold {
        Some(format!(
            "Questa settimana ha fatto {}°C più caldo {}.",
            format_number(delta, 1),
            reference
        ))
    } else if delta < -threshold {
        Some(format!(
            "Questa settimana ha fatto {}°C più freddo {}.",
            format_number(-delta, 1),
            reference
        ))
    } else {
        None
    }
}

fn statement(topic: TrendTopic, against: WindowKind, text: String) -> TrendStatement {
    TrendStatement {
        topic,
        window_a: WindowKind::Week,
        window_b: against,
        text,
    }
}
