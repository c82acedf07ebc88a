//! The weather reflection: four concurrent fetches, three climate windows, trends and text.

use crate::analysis::{
    analyze_decade, analyze_week, analyze_year, compare_trends, monthly_aggregates,
    TrendThresholds,
};
use crate::api::WeatherSource;
use crate::error::Result;
use crate::models::{ClimateWindow, DailyArchive, TrendStatement};
use crate::narrative::render;
use chrono::{Duration, Months, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

/// Days the archive lags behind today.
pub const ARCHIVE_LAG_DAYS: i64 = 5;

/// Years of history behind the decade window.
pub const DECADE_YEARS: u32 = 10;

/// Everything the weather pipeline produced for one location.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherReflection {
    pub week: ClimateWindow,
    pub year: Option<ClimateWindow>,
    pub decade: Option<ClimateWindow>,
    pub trends: Vec<TrendStatement>,
    /// Rendered Italian narrative, one sentence per line.
    pub text: String,
}

/// Fetches the four series concurrently and runs the window → trend → text pipeline.
///
/// Fetch failures are logged and the affected window is dropped. Without hourly weather there
/// is no week to anchor the other windows on, so the whole reflection is `None`.
pub async fn reflect<W>(
    source: &W,
    latitude: f64,
    longitude: f64,
    today: NaiveDate,
    thresholds: &TrendThresholds,
) -> Option<WeatherReflection>
where
    W: WeatherSource + ?Sized,
{
    let archive_end = today - Duration::days(ARCHIVE_LAG_DAYS);
    let year_start = archive_end - Duration::days(365);
    let decade_start = archive_end
        .checked_sub_months(Months::new(12 * DECADE_YEARS))
        .unwrap_or(year_start);

    info!("Building weather reflection for ({}, {})", latitude, longitude);
    let (hourly, air_quality, year_archive, decade_archive) = tokio::join!(
        source.hourly_weather(latitude, longitude),
        source.hourly_air_quality(latitude, longitude),
        source.daily_archive(latitude, longitude, year_start, archive_end),
        source.daily_archive(latitude, longitude, decade_start, archive_end),
    );

    let hourly = recover(hourly, "hourly weather")?;
    let air_quality = recover(air_quality, "air quality");
    let year_archive = recover(year_archive, "one-year archive").filter(has_days);
    let decade_archive = recover(decade_archive, "ten-year archive").filter(has_days);

    let week = analyze_week(&hourly, air_quality.as_ref());
    let year = year_archive.as_ref().map(analyze_year);
    let decade = decade_archive
        .as_ref()
        .map(|archive| analyze_decade(&monthly_aggregates(archive), &week));

    let trends = compare_trends(&week, decade.as_ref(), year.as_ref(), thresholds);
    let text = render(&week, year.as_ref(), decade.as_ref(), &trends);

    Some(WeatherReflection {
        week,
        year,
        decade,
        trends,
        text,
    })
}

fn recover<T>(result: Result<T>, what: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Could not fetch {}; continuing without it: {}", what, e);
            None
        },
    }
}

fn has_days(archive: &DailyArchive) -> bool {
    !archive.days().is_empty()
}
