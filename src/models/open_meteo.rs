//! Defines the ingestion schema for Open-Meteo responses and the typed series built from it.
//!
//! Includes structs for:
//! - Deserializing forecast, air-quality and archive responses (`HourlyResponse`,
//!   `AirQualityResponse`, `ArchiveResponse`), where every variable array is optional and
//!   every element may be `null`.
//! - The typed, validated series handed to the analyzers (`TimeSeries`, `HourlyWeather`,
//!   `AirQualitySeries`, `DailyArchive`).

use crate::error::{AppError, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Timestamp layout used by Open-Meteo for hourly data (`2024-05-01T13:00`).
const HOURLY_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Represents geographical coordinates (reusable).
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }

    /// Returns the `(latitude, longitude)` pair when both are present and finite.
    pub fn pair(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => Some((lat, lon)),
            _ => None,
        }
    }
}

// --- Raw API Response Structs ---

/// Response of the `/v1/forecast` endpoint queried with `hourly=` variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HourlyResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    #[serde(default)]
    pub hourly: Option<HourlyBlock>,
}

/// Column-oriented hourly weather block.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct HourlyBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub relative_humidity_2m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub pressure_msl: Option<Vec<Option<f64>>>,
}

/// Response of the air-quality `/v1/air-quality` endpoint.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AirQualityResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub hourly: Option<AirQualityBlock>,
}

/// Column-oriented hourly pollutant block (µg/m³).
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AirQualityBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub pm2_5: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub pm10: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub ozone: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub nitrogen_dioxide: Option<Vec<Option<f64>>>,
}

/// Response of the historical `/v1/archive` endpoint queried with `daily=` variables.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ArchiveResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub daily: Option<DailyBlock>,
}

/// Column-oriented daily archive block.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DailyBlock {
    #[serde(default)]
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub temperature_2m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub temperature_2m_min: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub relative_humidity_2m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub precipitation_sum: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m_mean: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub wind_speed_10m_max: Option<Vec<Option<f64>>>,
    #[serde(default)]
    pub pressure_msl_mean: Option<Vec<Option<f64>>>,
}

// --- Typed Series ---

/// A single observation; `value` is `None` when the provider reported `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    pub at: NaiveDateTime,
    pub value: Option<f64>,
}

/// An ordered sequence of samples for one physical quantity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    samples: Vec<Sample>,
}

impl TimeSeries {
    /// Builds a series from samples, sorting them by timestamp.
    /// Non-finite values are stored as missing.
    pub fn new(mut samples: Vec<Sample>) -> Self {
        for sample in samples.iter_mut() {
            if matches!(sample.value, Some(v) if !v.is_finite()) {
                sample.value = None;
            }
        }
        samples.sort_by_key(|s| s.at);
        Self { samples }
    }

    /// Pairs a timestamp column with one value column.
    /// Extra entries on either side are dropped with a warning.
    pub fn from_columns(times: &[NaiveDateTime], values: &[Option<f64>], label: &str) -> Self {
        if times.len() != values.len() {
            warn!(
                "Column '{}' has {} values for {} timestamps; truncating to the shorter one",
                label,
                values.len(),
                times.len()
            );
        }
        let samples = times
            .iter()
            .zip(values.iter())
            .map(|(at, value)| Sample {
                at: *at,
                value: *value,
            })
            .collect();
        Self::new(samples)
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Iterates over the raw values, missing ones included.
    pub fn values(&self) -> impl Iterator<Item = Option<f64>> + '_ {
        self.samples.iter().map(|s| s.value)
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns `true` when at least one sample carries a value.
    pub fn has_values(&self) -> bool {
        self.samples.iter().any(|s| s.value.is_some())
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.samples.last().map(|s| s.at)
    }
}

/// The last seven days of hourly weather at one location.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HourlyWeather {
    pub temperature: TimeSeries,
    pub humidity: TimeSeries,
    pub precipitation: TimeSeries,
    pub wind_speed: TimeSeries,
    pub pressure: TimeSeries,
}

impl HourlyWeather {
    /// Date of the most recent timestamp across all series.
    pub fn last_date(&self) -> Option<NaiveDate> {
        [
            &self.temperature,
            &self.humidity,
            &self.precipitation,
            &self.wind_speed,
            &self.pressure,
        ]
        .iter()
        .filter_map(|s| s.last_timestamp())
        .max()
        .map(|t| t.date())
    }
}

impl TryFrom<HourlyResponse> for HourlyWeather {
    type Error = AppError;

    fn try_from(response: HourlyResponse) -> Result<Self> {
        let block = response.hourly.ok_or_else(|| {
            AppError::MalformedResponse("forecast response has no 'hourly' block".to_string())
        })?;
        let times = parse_hourly_times(&block.time)?;

        Ok(Self {
            temperature: column(&times, block.temperature_2m, "temperature_2m"),
            humidity: column(&times, block.relative_humidity_2m, "relative_humidity_2m"),
            precipitation: column(&times, block.precipitation, "precipitation"),
            wind_speed: column(&times, block.wind_speed_10m, "wind_speed_10m"),
            pressure: column(&times, block.pressure_msl, "pressure_msl"),
        })
    }
}

/// Hourly pollutant concentrations; a pollutant the provider did not return is `None`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AirQualitySeries {
    pub pm2_5: Option<TimeSeries>,
    pub pm10: Option<TimeSeries>,
    pub ozone: Option<TimeSeries>,
    pub nitrogen_dioxide: Option<TimeSeries>,
}

impl AirQualitySeries {
    /// Returns `true` when no pollutant carries a single usable value.
    pub fn is_empty(&self) -> bool {
        [&self.pm2_5, &self.pm10, &self.ozone, &self.nitrogen_dioxide]
            .iter()
            .all(|s| s.as_ref().map_or(true, |series| !series.has_values()))
    }
}

impl TryFrom<AirQualityResponse> for AirQualitySeries {
    type Error = AppError;

    fn try_from(response: AirQualityResponse) -> Result<Self> {
        let block = response.hourly.ok_or_else(|| {
            AppError::MalformedResponse("air-quality response has no 'hourly' block".to_string())
        })?;
        let times = parse_hourly_times(&block.time)?;
        let optional = |values: Option<Vec<Option<f64>>>, label: &str| {
            values.map(|v| TimeSeries::from_columns(&times, &v, label))
        };

        Ok(Self {
            pm2_5: optional(block.pm2_5, "pm2_5"),
            pm10: optional(block.pm10, "pm10"),
            ozone: optional(block.ozone, "ozone"),
            nitrogen_dioxide: optional(block.nitrogen_dioxide, "nitrogen_dioxide"),
        })
    }
}

/// Daily climate archive; every series is indexed by midnight of its day.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DailyArchive {
    pub temperature_mean: TimeSeries,
    pub temperature_max: TimeSeries,
    pub temperature_min: TimeSeries,
    pub humidity_mean: TimeSeries,
    pub precipitation_sum: TimeSeries,
    pub wind_speed_mean: TimeSeries,
    pub wind_speed_max: TimeSeries,
    pub pressure_mean: TimeSeries,
}

impl DailyArchive {
    /// Every distinct day covered by the archive, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        let mut days: Vec<NaiveDate> = self
            .series()
            .iter()
            .flat_map(|s| s.samples().iter().map(|sample| sample.at.date()))
            .collect();
        days.sort();
        days.dedup();
        days
    }

    fn series(&self) -> [&TimeSeries; 8] {
        [
            &self.temperature_mean,
            &self.temperature_max,
            &self.temperature_min,
            &self.humidity_mean,
            &self.precipitation_sum,
            &self.wind_speed_mean,
            &self.wind_speed_max,
            &self.pressure_mean,
        ]
    }
}

impl TryFrom<ArchiveResponse> for DailyArchive {
    type Error = AppError;

    fn try_from(response: ArchiveResponse) -> Result<Self> {
        let block = response.daily.ok_or_else(|| {
            AppError::MalformedResponse("archive response has no 'daily' block".to_string())
        })?;
        let times = block
            .time
            .iter()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map(|d| d.and_time(NaiveTime::default()))
                    .map_err(|e| {
                        AppError::MalformedResponse(format!("invalid archive date '{}': {}", raw, e))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            temperature_mean: column(&times, block.temperature_2m_mean, "temperature_2m_mean"),
            temperature_max: column(&times, block.temperature_2m_max, "temperature_2m_max"),
            temperature_min: column(&times, block.temperature_2m_min, "temperature_2m_min"),
            humidity_mean: column(
                &times,
                block.relative_humidity_2m_mean,
                "relative_humidity_2m_mean",
            ),
            precipitation_sum: column(&times, block.precipitation_sum, "precipitation_sum"),
            wind_speed_mean: column(&times, block.wind_speed_10m_mean, "wind_speed_10m_mean"),
            wind_speed_max: column(&times, block.wind_speed_10m_max, "wind_speed_10m_max"),
            pressure_mean: column(&times, block.pressure_msl_mean, "pressure_msl_mean"),
        })
    }
}

fn parse_hourly_times(raw: &[String]) -> Result<Vec<NaiveDateTime>> {
    raw.iter()
        .map(|t| {
            NaiveDateTime::parse_from_str(t, HOURLY_FORMAT).map_err(|e| {
                AppError::MalformedResponse(format!("invalid hourly timestamp '{}': {}", t, e))
            })
        })
        .collect()
}

/// A variable the provider omitted becomes an empty series.
fn column(times: &[NaiveDateTime], values: Option<Vec<Option<f64>>>, label: &str) -> TimeSeries {
    match values {
        Some(values) => TimeSeries::from_columns(times, &values, label),
        None => {
            warn!("Variable '{}' missing from provider response", label);
            TimeSeries::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hourly_response_with_nulls_and_missing_columns() {
        let response: HourlyResponse = serde_json::from_value(json!({
            "latitude": 45.0,
            "longitude": 9.0,
            "hourly": {
                "time": ["2024-05-01T00:00", "2024-05-01T01:00", "2024-05-01T02:00"],
                "temperature_2m": [12.5, null, 13.0],
                "precipitation": [0.0, 0.2, null]
            }
        }))
        .unwrap();

        let weather = HourlyWeather::try_from(response).unwrap();
        assert_eq!(weather.temperature.samples().len(), 3);
        assert_eq!(weather.temperature.samples()[1].value, None);
        assert!(weather.humidity.is_empty());
        assert_eq!(
            weather.last_date(),
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn test_hourly_response_without_block_is_malformed() {
        let response: HourlyResponse = serde_json::from_value(json!({"latitude": 1.0})).unwrap();
        let result = HourlyWeather::try_from(response);
        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
    }

    #[test]
    fn test_invalid_timestamp_is_malformed() {
        let response: HourlyResponse = serde_json::from_value(json!({
            "hourly": { "time": ["yesterday"], "temperature_2m": [1.0] }
        }))
        .unwrap();
        assert!(HourlyWeather::try_from(response).is_err());
    }

    #[test]
    fn test_mismatched_columns_are_truncated() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let times = vec![t0, t0 + chrono::Duration::hours(1)];
        let series = TimeSeries::from_columns(&times, &[Some(1.0)], "test");
        assert_eq!(series.samples().len(), 1);
    }

    #[test]
    fn test_non_finite_values_become_missing() {
        let t0 = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let series = TimeSeries::new(vec![Sample {
            at: t0,
            value: Some(f64::NAN),
        }]);
        assert!(!series.has_values());
    }

    #[test]
    fn test_air_quality_emptiness() {
        let response: AirQualityResponse = serde_json::from_value(json!({
            "hourly": { "time": ["2024-05-01T00:00"], "pm10": [null] }
        }))
        .unwrap();
        let series = AirQualitySeries::try_from(response).unwrap();
        assert!(series.pm2_5.is_none());
        assert!(series.pm10.is_some());
        assert!(series.is_empty());
    }

    #[test]
    fn test_archive_days_are_sorted_and_unique() {
        let response: ArchiveResponse = serde_json::from_value(json!({
            "daily": {
                "time": ["2024-01-02", "2024-01-01"],
                "temperature_2m_mean": [3.0, 2.0],
                "precipitation_sum": [0.0, 1.5]
            }
        }))
        .unwrap();
        let archive = DailyArchive::try_from(response).unwrap();
        let days = archive.days();
        assert_eq!(days.len(), 2);
        assert!(days[0] < days[1]);
        assert_eq!(archive.temperature_mean.samples()[0].value, Some(2.0));
    }

    #[test]
    fn test_coordinates_pair() {
        assert_eq!(Coordinates::new(45.0, 9.0).pair(), Some((45.0, 9.0)));
        let partial = Coordinates {
            latitude: Some(45.0),
            longitude: None,
        };
        assert_eq!(partial.pair(), None);
    }
}
