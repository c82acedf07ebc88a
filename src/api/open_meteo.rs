//! Provides a client for the Open-Meteo forecast, air-quality and archive APIs.
//!
//! This module defines the `WeatherSource` seam used by the reflection pipeline and the
//! `OpenMeteoClient` implementing it over HTTP.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::{
    AirQualityResponse, AirQualitySeries, ArchiveResponse, DailyArchive, HourlyResponse,
    HourlyWeather,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, error, info};

const FORECAST_VARIABLES: &str =
    "temperature_2m,relative_humidity_2m,precipitation,wind_speed_10m,pressure_msl";
const AIR_QUALITY_VARIABLES: &str = "pm2_5,pm10,ozone,nitrogen_dioxide";
const ARCHIVE_VARIABLES: &str = "temperature_2m_mean,temperature_2m_max,temperature_2m_min,relative_humidity_2m_mean,precipitation_sum,wind_speed_10m_mean,wind_speed_10m_max,pressure_msl_mean";

/// Days of hourly history requested for the week window.
pub const PAST_DAYS: u32 = 7;

/// Anything able to provide the three kinds of series the climate windows are built from.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Hourly weather for the last `PAST_DAYS` days.
    async fn hourly_weather(&self, latitude: f64, longitude: f64) -> Result<HourlyWeather>;

    /// Hourly pollutant concentrations for the last `PAST_DAYS` days.
    async fn hourly_air_quality(&self, latitude: f64, longitude: f64) -> Result<AirQualitySeries>;

    /// Daily historical data between `start` and `end`, both inclusive.
    async fn daily_archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyArchive>;
}

#[async_trait]
impl<T: WeatherSource + ?Sized> WeatherSource for Box<T> {
    async fn hourly_weather(&self, latitude: f64, longitude: f64) -> Result<HourlyWeather> {
        (**self).hourly_weather(latitude, longitude).await
    }

    async fn hourly_air_quality(&self, latitude: f64, longitude: f64) -> Result<AirQualitySeries> {
        (**self).hourly_air_quality(latitude, longitude).await
    }

    async fn daily_archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyArchive> {
        (**self).daily_archive(latitude, longitude, start, end).await
    }
}

/// An asynchronous client for the Open-Meteo APIs.
pub struct OpenMeteoClient {
    client: Client,
    forecast_url: String,
    air_quality_url: String,
    archive_url: String,
    timezone: String,
}

impl OpenMeteoClient {
    /// Creates a client using the endpoints, timezone and request timeout from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Ok(Self {
            client,
            forecast_url: config.forecast_url.clone(),
            air_quality_url: config.air_quality_url.clone(),
            archive_url: config.archive_url.clone(),
            timezone: config.timezone.clone(),
        })
    }

    /// Creates a client whose three endpoints live under `base_url`
    /// (`/forecast`, `/air-quality`, `/archive`).
    ///
    /// This is primarily intended for testing purposes (e.g., using a mock server).
    #[cfg(test)]
    pub fn new_with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            forecast_url: format!("{}/forecast", base_url),
            air_quality_url: format!("{}/air-quality", base_url),
            archive_url: format!("{}/archive", base_url),
            timezone: crate::config::DEFAULT_TIMEZONE.to_string(),
        }
    }

    fn location_query(&self, latitude: f64, longitude: f64) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", latitude.to_string()),
            ("longitude", longitude.to_string()),
            ("timezone", self.timezone.clone()),
        ]
    }

    /// Sends a GET request and decodes the JSON body, logging every failure.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&'static str, String)],
        what: &str,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Error fetching {}: {}", what, e);
                AppError::Api(Arc::new(e))
            })?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                let status = e.status();
                error!(
                    "{} request to {} failed with status {}: {}",
                    what,
                    url,
                    status.unwrap_or_default(),
                    e
                );
                if status == Some(reqwest::StatusCode::BAD_REQUEST) {
                    error!("Received 400 Bad Request. Check coordinates, variables and date range.");
                } else if status == Some(reqwest::StatusCode::TOO_MANY_REQUESTS) {
                    error!("Received 429. The Open-Meteo rate limit has been reached.");
                }
                return Err(AppError::Api(Arc::new(e)));
            },
        };

        let body = response.text().await.map_err(|e| {
            error!("Error reading {} response body: {}", what, e);
            AppError::Api(Arc::new(e))
        })?;
        serde_json::from_str(&body).map_err(|e| {
            error!("Error parsing {} response JSON: {}", what, e);
            AppError::from(e)
        })
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoClient {
    async fn hourly_weather(&self, latitude: f64, longitude: f64) -> Result<HourlyWeather> {
        info!("Fetching hourly weather for ({}, {})", latitude, longitude);
        let mut query = self.location_query(latitude, longitude);
        query.push(("hourly", FORECAST_VARIABLES.to_string()));
        query.push(("past_days", PAST_DAYS.to_string()));
        query.push(("forecast_days", "0".to_string()));

        let response: HourlyResponse = self
            .get_json(&self.forecast_url, &query, "forecast")
            .await?;
        let weather = HourlyWeather::try_from(response)?;
        debug!("Received {} hourly samples", weather.temperature.samples().len());
        Ok(weather)
    }

    async fn hourly_air_quality(&self, latitude: f64, longitude: f64) -> Result<AirQualitySeries> {
        info!("Fetching hourly air quality for ({}, {})", latitude, longitude);
        let mut query = self.location_query(latitude, longitude);
        query.push(("hourly", AIR_QUALITY_VARIABLES.to_string()));
        query.push(("past_days", PAST_DAYS.to_string()));
        query.push(("forecast_days", "0".to_string()));

        let response: AirQualityResponse = self
            .get_json(&self.air_quality_url, &query, "air quality")
            .await?;
        AirQualitySeries::try_from(response)
    }

    async fn daily_archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyArchive> {
        info!(
            "Fetching daily archive for ({}, {}) from {} to {}",
            latitude, longitude, start, end
        );
        let mut query = self.location_query(latitude, longitude);
        query.push(("daily", ARCHIVE_VARIABLES.to_string()));
        query.push(("start_date", start.format("%Y-%m-%d").to_string()));
        query.push(("end_date", end.format("%Y-%m-%d").to_string()));

        let response: ArchiveResponse = self.get_json(&self.archive_url, &query, "archive").await?;
        let archive = DailyArchive::try_from(response)?;
        debug!("Received {} archive days", archive.days().len());
        Ok(archive)
    }
}
