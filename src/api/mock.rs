//! Provides a synthetic weather source generating plausible Italian climate data.
//!
//! This is used by the `--offline` mode and by tests where consistent, controllable data is
//! needed without hitting the real Open-Meteo API. Every call reseeds its own generator from
//! the provider seed and the request, so identical requests always return identical series.

use super::{WeatherSource, PAST_DAYS};
use crate::error::Result;
use crate::models::{AirQualitySeries, DailyArchive, HourlyWeather, Sample, TimeSeries};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;

/// Deterministic stand-in for `OpenMeteoClient`.
#[derive(Debug, Clone)]
pub struct MockWeatherProvider {
    seed: u64,
    today: NaiveDate,
}

impl MockWeatherProvider {
    pub fn new(seed: u64, today: NaiveDate) -> Self {
        debug!("Creating MockWeatherProvider (seed {}, today {})", seed, today);
        Self { seed, today }
    }

    fn rng_for(&self, salt: u64, latitude: f64, longitude: f64) -> StdRng {
        let position = ((latitude * 1_000.0) as i64 as u64)
            ^ ((longitude * 1_000.0) as i64 as u64).rotate_left(32);
        StdRng::seed_from_u64(self.seed ^ salt.rotate_left(48) ^ position)
    }

    /// Hourly timestamps covering the `PAST_DAYS` days before today.
    fn past_hours(&self) -> Vec<NaiveDateTime> {
        let start = self.today - Duration::days(PAST_DAYS as i64);
        (0..PAST_DAYS as i64 * 24)
            .filter_map(|h| start.and_hms_opt(0, 0, 0).map(|t| t + Duration::hours(h)))
            .collect()
    }
}

/// Seasonal mean temperature for a mid-latitude Italian site, peaking late July.
fn seasonal_temperature(date: NaiveDate) -> f64 {
    let day = date.ordinal() as f64;
    14.0 + 10.0 * (2.0 * PI * (day - 115.0) / 365.25).sin()
}

fn series<F>(times: &[NaiveDateTime], mut value: F) -> TimeSeries
where
    F: FnMut(NaiveDateTime) -> f64,
{
    TimeSeries::new(
        times
            .iter()
            .map(|at| Sample {
                at: *at,
                value: Some((value(*at) * 10.0).round() / 10.0),
            })
            .collect(),
    )
}

#[async_trait]
impl WeatherSource for MockWeatherProvider {
    async fn hourly_weather(&self, latitude: f64, longitude: f64) -> Result<HourlyWeather> {
        let mut rng = self.rng_for(1, latitude, longitude);
        let times = self.past_hours();
        debug!("Generating {} mock hourly weather samples", times.len());

        Ok(HourlyWeather {
            temperature: series(&times, |at| {
                let daily = 4.0 * (2.0 * PI * (at.hour() as f64 - 9.0) / 24.0).sin();
                seasonal_temperature(at.date()) + daily + rng.gen_range(-1.5..1.5)
            }),
            humidity: series(&times, |_| rng.gen_range(45.0..85.0)),
            precipitation: series(&times, |_| {
                if rng.gen_bool(0.08) {
                    rng.gen_range(0.1..3.0)
                } else {
                    0.0
                }
            }),
            wind_speed: series(&times, |_| rng.gen_range(2.0..22.0)),
            pressure: series(&times, |_| rng.gen_range(1004.0..1024.0)),
        })
    }

    async fn hourly_air_quality(&self, latitude: f64, longitude: f64) -> Result<AirQualitySeries> {
        let mut rng = self.rng_for(2, latitude, longitude);
        let times = self.past_hours();

        Ok(AirQualitySeries {
            pm2_5: Some(series(&times, |_| rng.gen_range(4.0..28.0))),
            pm10: Some(series(&times, |_| rng.gen_range(8.0..45.0))),
            ozone: Some(series(&times, |_| rng.gen_range(30.0..130.0))),
            nitrogen_dioxide: Some(series(&times, |_| rng.gen_range(5.0..50.0))),
        })
    }

    async fn daily_archive(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailyArchive> {
        let salt = (start.num_days_from_ce() as u64) ^ ((end.num_days_from_ce() as u64) << 20);
        let mut rng = self.rng_for(salt, latitude, longitude);
        let days: Vec<NaiveDateTime> = start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter_map(|d| d.and_hms_opt(0, 0, 0))
            .collect();
        debug!("Generating {} mock archive days", days.len());

        let temperature_mean = series(&days, |at| {
            seasonal_temperature(at.date()) + rng.gen_range(-3.0..3.0)
        });
        let temperature_max = series(&days, |at| {
            seasonal_temperature(at.date()) + rng.gen_range(4.0..8.0)
        });
        let temperature_min = series(&days, |at| {
            seasonal_temperature(at.date()) - rng.gen_range(4.0..8.0)
        });

        Ok(DailyArchive {
            temperature_mean,
            temperature_max,
            temperature_min,
            humidity_mean: series(&days, |_| rng.gen_range(50.0..80.0)),
            precipitation_sum: series(&days, |_| {
                if rng.gen_bool(0.25) {
                    rng.gen_range(0.5..18.0)
                } else {
                    0.0
                }
            }),
            wind_speed_mean: series(&days, |_| rng.gen_range(4.0..15.0)),
            wind_speed_max: series(&days, |_| rng.gen_range(15.0..45.0)),
            pressure_mean: series(&days, |_| rng.gen_range(1006.0..1022.0)),
        })
    }
}
