//! Builds the three climate windows (week, year, decade) from typed series.
//!
//! Each window is computed independently and never merged with the others. The only
//! dependency between them is that the decade window is seasonally aligned on the last
//! date of the week window.

use super::stats;
use crate::models::{
    AirQualitySeries, ClimateWindow, DailyArchive, HourlyWeather, MonthlyAggregate,
    TemperatureStats, TimeSeries, WindStats, WindowKind,
};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use tracing::debug;

/// Score reported when no pollutant series is available at all.
pub const NEUTRAL_AIR_QUALITY_SCORE: f64 = 75.0;

const AIR_QUALITY_BASELINE: f64 = 100.0;

/// `(breakpoint µg/m³, penalty)` pairs, highest breakpoint first.
/// Only the first band whose breakpoint the period mean exceeds is applied.
const PM2_5_BANDS: &[(f64, f64)] = &[(75.0, 40.0), (50.0, 30.0), (25.0, 20.0), (15.0, 10.0)];
const PM10_BANDS: &[(f64, f64)] = &[(100.0, 30.0), (50.0, 20.0), (40.0, 10.0)];
const OZONE_BANDS: &[(f64, f64)] = &[(240.0, 30.0), (180.0, 20.0), (120.0, 10.0)];
const NO2_BANDS: &[(f64, f64)] = &[(200.0, 30.0), (100.0, 20.0), (40.0, 10.0)];

/// Number of trailing months used when no month matches the reference week.
const TRAILING_MONTHS: usize = 12;

/// Summarizes the last seven days of hourly data.
pub fn analyze_week(hourly: &HourlyWeather, air_quality: Option<&AirQualitySeries>) -> ClimateWindow {
    let window = ClimateWindow {
        kind: WindowKind::Week,
        period_end: hourly.last_date(),
        sample_count: stats::count_present(hourly.temperature.values()),
        temperature: temperature_stats(&hourly.temperature, &hourly.temperature, &hourly.temperature),
        humidity: stats::mean(hourly.humidity.values()),
        precipitation: stats::sum(hourly.precipitation.values()),
        wind: WindStats {
            mean: stats::mean(hourly.wind_speed.values()),
            max: stats::max(hourly.wind_speed.values()),
        },
        pressure: stats::mean(hourly.pressure.values()),
        air_quality_score: Some(air_quality_score(air_quality)),
    };
    debug!(
        "Week window: {} temperature samples, mean {:.1}°C, rain {:.1} mm",
        window.sample_count, window.temperature.mean, window.precipitation
    );
    window
}

/// Summarizes one year of daily archive data.
pub fn analyze_year(archive: &DailyArchive) -> ClimateWindow {
    let window = ClimateWindow {
        kind: WindowKind::Year,
        period_end: archive.days().last().copied(),
        sample_count: stats::count_present(archive.temperature_mean.values()),
        temperature: temperature_stats(
            &archive.temperature_mean,
            &archive.temperature_max,
            &archive.temperature_min,
        ),
        humidity: stats::mean(archive.humidity_mean.values()),
        precipitation: stats::sum(archive.precipitation_sum.values()),
        wind: WindStats {
            mean: stats::mean(archive.wind_speed_mean.values()),
            max: stats::max(archive.wind_speed_max.values()),
        },
        pressure: stats::mean(archive.pressure_mean.values()),
        air_quality_score: None,
    };
    debug!(
        "Year window: {} days, mean {:.1}°C, rain {:.1} mm",
        window.sample_count, window.temperature.mean, window.precipitation
    );
    window
}

/// Summarizes the decade archive, seasonally aligned on the week's last date.
///
/// Month selection falls back in three tiers: entries of the reference month, then the
/// trailing twelve usable months, then the whole series.
pub fn analyze_decade(monthly: &[MonthlyAggregate], reference_week: &ClimateWindow) -> ClimateWindow {
    let same_month: Vec<&MonthlyAggregate> = match reference_week.period_end {
        Some(end) => monthly
            .iter()
            .filter(|m| m.month == end.month() && m.is_usable())
            .collect(),
        None => Vec::new(),
    };

    let selected = if !same_month.is_empty() {
        debug!("Decade window aligned on month {:?}", reference_week.period_end.map(|d| d.month()));
        same_month
    } else {
        let usable: Vec<&MonthlyAggregate> = monthly.iter().filter(|m| m.is_usable()).collect();
        if !usable.is_empty() {
            debug!("No aligned months; using the trailing {} usable months", TRAILING_MONTHS);
            usable[usable.len().saturating_sub(TRAILING_MONTHS)..].to_vec()
        } else {
            debug!("No usable months; using the full decade series");
            monthly.iter().collect()
        }
    };

    let field = |f: fn(&MonthlyAggregate) -> Option<f64>| selected.iter().map(|m| f(m)).collect::<Vec<_>>();
    let means = field(|m| m.temperature_mean);

    ClimateWindow {
        kind: WindowKind::Decade,
        period_end: selected
            .last()
            .and_then(|m| NaiveDate::from_ymd_opt(m.year, m.month, 1)),
        sample_count: selected.len(),
        temperature: TemperatureStats {
            mean: stats::mean(means.clone()),
            max: stats::max(field(|m| m.temperature_max)),
            min: stats::min(field(|m| m.temperature_min)),
            std_dev: stats::std_dev(means),
        },
        humidity: stats::mean(field(|m| m.humidity_mean)),
        precipitation: stats::mean(field(|m| m.precipitation_sum)),
        wind: WindStats {
            mean: stats::mean(field(|m| m.wind_mean)),
            max: stats::max(field(|m| m.wind_max)),
        },
        pressure: stats::mean(field(|m| m.pressure_mean)),
        air_quality_score: None,
    }
}

/// Groups a daily archive into calendar months, oldest first.
pub fn monthly_aggregates(archive: &DailyArchive) -> Vec<MonthlyAggregate> {
    let temperature_mean = by_month(&archive.temperature_mean);
    let temperature_max = by_month(&archive.temperature_max);
    let temperature_min = by_month(&archive.temperature_min);
    let humidity = by_month(&archive.humidity_mean);
    let precipitation = by_month(&archive.precipitation_sum);
    let wind_mean = by_month(&archive.wind_speed_mean);
    let wind_max = by_month(&archive.wind_speed_max);
    let pressure = by_month(&archive.pressure_mean);

    let mut months: Vec<(i32, u32)> = archive
        .days()
        .iter()
        .map(|d| (d.year(), d.month()))
        .collect();
    months.dedup();

    months
        .into_iter()
        .map(|key| {
            let values = |map: &BTreeMap<(i32, u32), Vec<Option<f64>>>| {
                map.get(&key).cloned().unwrap_or_default()
            };
            MonthlyAggregate {
                year: key.0,
                month: key.1,
                temperature_mean: stats::mean_opt(values(&temperature_mean)),
                temperature_max: present_or_none(values(&temperature_max), stats::max),
                temperature_min: present_or_none(values(&temperature_min), stats::min),
                humidity_mean: stats::mean_opt(values(&humidity)),
                precipitation_sum: present_or_none(values(&precipitation), stats::sum),
                wind_mean: stats::mean_opt(values(&wind_mean)),
                wind_max: present_or_none(values(&wind_max), stats::max),
                pressure_mean: stats::mean_opt(values(&pressure)),
            }
        })
        .collect()
}

/// Additive penalty model: each pollutant is checked in isolation against its own bands and
/// the penalties sum. Floored at 0.
pub fn air_quality_score(air_quality: Option<&AirQualitySeries>) -> f64 {
    let Some(series) = air_quality.filter(|s| !s.is_empty()) else {
        return NEUTRAL_AIR_QUALITY_SCORE;
    };

    let penalty: f64 = [
        (&series.pm2_5, PM2_5_BANDS),
        (&series.pm10, PM10_BANDS),
        (&series.ozone, OZONE_BANDS),
        (&series.nitrogen_dioxide, NO2_BANDS),
    ]
    .into_iter()
    .filter_map(|(pollutant, bands)| {
        let mean = stats::mean_opt(pollutant.as_ref()?.values())?;
        Some(band_penalty(mean, bands))
    })
    .sum();

    (AIR_QUALITY_BASELINE - penalty).max(0.0)
}

fn band_penalty(mean: f64, bands: &[(f64, f64)]) -> f64 {
    bands
        .iter()
        .find(|(breakpoint, _)| mean > *breakpoint)
        .map(|(_, penalty)| *penalty)
        .unwrap_or(0.0)
}

fn temperature_stats(means: &TimeSeries, maxima: &TimeSeries, minima: &TimeSeries) -> TemperatureStats {
    TemperatureStats {
        mean: stats::mean(means.values()),
        max: stats::max(maxima.values()),
        min: stats::min(minima.values()),
        std_dev: stats::std_dev(means.values()),
    }
}

fn by_month(series: &TimeSeries) -> BTreeMap<(i32, u32), Vec<Option<f64>>> {
    let mut grouped: BTreeMap<(i32, u32), Vec<Option<f64>>> = BTreeMap::new();
    for sample in series.samples() {
        let date = sample.at.date();
        grouped
            .entry((date.year(), date.month()))
            .or_default()
            .push(sample.value);
    }
    grouped
}

fn present_or_none(values: Vec<Option<f64>>, aggregate: fn(Vec<Option<f64>>) -> f64) -> Option<f64> {
    if stats::count_present(values.iter().copied()) == 0 {
        None
    } else {
        Some(aggregate(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sample;
    use approx::assert_relative_eq;
    use chrono::{Duration, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn hourly_series(values: &[Option<f64>]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Sample {
                    at: start() + Duration::hours(i as i64),
                    value: *v,
                })
                .collect(),
        )
    }

    fn daily_series(from: NaiveDate, values: &[Option<f64>]) -> TimeSeries {
        TimeSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| Sample {
                    at: (from + Duration::days(i as i64)).and_hms_opt(0, 0, 0).unwrap(),
                    value: *v,
                })
                .collect(),
        )
    }

    fn month(year: i32, month: u32, temperature: Option<f64>, rain: f64) -> MonthlyAggregate {
        MonthlyAggregate {
            year,
            month,
            temperature_mean: temperature,
            temperature_max: temperature.map(|t| t + 5.0),
            temperature_min: temperature.map(|t| t - 5.0),
            humidity_mean: Some(60.0),
            precipitation_sum: Some(rain),
            wind_mean: Some(8.0),
            wind_max: Some(30.0),
            pressure_mean: Some(1015.0),
        }
    }

    fn week_ending(date: Option<NaiveDate>) -> ClimateWindow {
        ClimateWindow {
            period_end: date,
            ..ClimateWindow::empty(WindowKind::Week)
        }
    }

    #[test]
    fn test_week_sums_precipitation_and_skips_nulls() {
        let hourly = HourlyWeather {
            temperature: hourly_series(&[Some(20.0), None, Some(30.0)]),
            humidity: hourly_series(&[Some(50.0), Some(70.0), None]),
            precipitation: hourly_series(&[Some(1.5), None, Some(2.5)]),
            wind_speed: hourly_series(&[Some(5.0), Some(15.0), Some(10.0)]),
            pressure: hourly_series(&[None, None, None]),
        };

        let week = analyze_week(&hourly, None);
        assert_eq!(week.kind, WindowKind::Week);
        assert_relative_eq!(week.temperature.mean, 25.0);
        assert_eq!(week.temperature.max, 30.0);
        assert_eq!(week.temperature.min, 20.0);
        assert_relative_eq!(week.temperature.std_dev, 5.0);
        assert_relative_eq!(week.humidity, 60.0);
        assert_relative_eq!(week.precipitation, 4.0);
        assert_eq!(week.wind.max, 15.0);
        assert_eq!(week.pressure, 0.0);
        assert_eq!(week.sample_count, 2);
        assert_eq!(week.period_end, NaiveDate::from_ymd_opt(2024, 7, 1));
        assert_eq!(week.air_quality_score, Some(NEUTRAL_AIR_QUALITY_SCORE));
    }

    #[test]
    fn test_empty_week_is_all_zero() {
        let week = analyze_week(&HourlyWeather::default(), None);
        assert_eq!(week.temperature.mean, 0.0);
        assert_eq!(week.precipitation, 0.0);
        assert_eq!(week.period_end, None);
    }

    #[test]
    fn test_air_quality_penalties_sum_per_pollutant() {
        let clean = AirQualitySeries {
            pm2_5: Some(hourly_series(&[Some(5.0), Some(7.0)])),
            ..Default::default()
        };
        assert_eq!(air_quality_score(Some(&clean)), 100.0);

        // PM2.5 mean 30 -> 20, PM10 mean 60 -> 20, NO2 mean 45 -> 10.
        let polluted = AirQualitySeries {
            pm2_5: Some(hourly_series(&[Some(30.0), None])),
            pm10: Some(hourly_series(&[Some(60.0)])),
            ozone: Some(hourly_series(&[Some(80.0)])),
            nitrogen_dioxide: Some(hourly_series(&[Some(45.0)])),
        };
        assert_eq!(air_quality_score(Some(&polluted)), 50.0);
    }

    #[test]
    fn test_air_quality_breakpoint_is_exclusive() {
        let at_breakpoint = AirQualitySeries {
            pm2_5: Some(hourly_series(&[Some(15.0)])),
            ..Default::default()
        };
        assert_eq!(air_quality_score(Some(&at_breakpoint)), 100.0);
    }

    #[test]
    fn test_air_quality_is_floored_at_zero() {
        let extreme = AirQualitySeries {
            pm2_5: Some(hourly_series(&[Some(300.0)])),
            pm10: Some(hourly_series(&[Some(300.0)])),
            ozone: Some(hourly_series(&[Some(300.0)])),
            nitrogen_dioxide: Some(hourly_series(&[Some(300.0)])),
        };
        assert_eq!(air_quality_score(Some(&extreme)), 0.0);
    }

    #[test]
    fn test_air_quality_without_series_is_neutral() {
        assert_eq!(air_quality_score(None), NEUTRAL_AIR_QUALITY_SCORE);
        let all_null = AirQualitySeries {
            ozone: Some(hourly_series(&[None, None])),
            ..Default::default()
        };
        assert_eq!(air_quality_score(Some(&all_null)), NEUTRAL_AIR_QUALITY_SCORE);
    }

    #[test]
    fn test_year_uses_daily_extremes() {
        let from = NaiveDate::from_ymd_opt(2023, 7, 1).unwrap();
        let archive = DailyArchive {
            temperature_mean: daily_series(from, &[Some(10.0), Some(20.0)]),
            temperature_max: daily_series(from, &[Some(15.0), Some(28.0)]),
            temperature_min: daily_series(from, &[Some(-2.0), Some(12.0)]),
            precipitation_sum: daily_series(from, &[Some(3.0), None]),
            ..Default::default()
        };
        let year = analyze_year(&archive);
        assert_relative_eq!(year.temperature.mean, 15.0);
        assert_eq!(year.temperature.max, 28.0);
        assert_eq!(year.temperature.min, -2.0);
        assert_relative_eq!(year.precipitation, 3.0);
        assert_eq!(year.period_end, NaiveDate::from_ymd_opt(2023, 7, 2));
        assert_eq!(year.air_quality_score, None);
    }

    #[test]
    fn test_monthly_aggregates_group_by_calendar_month() {
        let from = NaiveDate::from_ymd_opt(2024, 1, 30).unwrap();
        let archive = DailyArchive {
            temperature_mean: daily_series(from, &[Some(2.0), Some(4.0), Some(6.0)]),
            precipitation_sum: daily_series(from, &[Some(1.0), Some(2.0), None]),
            ..Default::default()
        };
        let months = monthly_aggregates(&archive);
        assert_eq!(months.len(), 2);
        assert_eq!((months[0].year, months[0].month), (2024, 1));
        assert_eq!(months[0].temperature_mean, Some(3.0));
        assert_eq!(months[0].precipitation_sum, Some(3.0));
        assert_eq!((months[1].year, months[1].month), (2024, 2));
        assert_eq!(months[1].precipitation_sum, None);
        assert_eq!(months[1].humidity_mean, None);
    }

    #[test]
    fn test_decade_aligns_on_reference_month() {
        let monthly = vec![
            month(2015, 1, Some(2.0), 60.0),
            month(2015, 7, Some(24.0), 20.0),
            month(2016, 1, Some(4.0), 80.0),
            month(2016, 7, Some(26.0), 40.0),
        ];
        let week = week_ending(NaiveDate::from_ymd_opt(2024, 7, 14));
        let decade = analyze_decade(&monthly, &week);
        assert_relative_eq!(decade.temperature.mean, 25.0);
        assert_relative_eq!(decade.precipitation, 30.0);
        assert_eq!(decade.sample_count, 2);
        assert_eq!(decade.period_end, NaiveDate::from_ymd_opt(2016, 7, 1));
    }

    #[test]
    fn test_decade_falls_back_to_trailing_months() {
        let monthly: Vec<MonthlyAggregate> = (1..=12)
            .map(|m| month(2015, m, Some(m as f64), 10.0))
            .chain((1..=5).map(|m| month(2016, m, Some(100.0), 10.0)))
            .collect();
        // August has no entry in 2016 and the 2015 one is unusable below.
        let mut monthly = monthly;
        monthly[7].temperature_mean = None;
        let week = week_ending(NaiveDate::from_ymd_opt(2024, 8, 3));
        let decade = analyze_decade(&monthly, &week);
        // Trailing 12 usable months: 2015-05..2015-12 without August (7 months) + 5 of 2016.
        assert_eq!(decade.sample_count, 12);
    }

    #[test]
    fn test_decade_falls_back_to_full_series() {
        let monthly = vec![month(2015, 1, None, 10.0), month(2015, 2, None, 30.0)];
        let decade = analyze_decade(&monthly, &week_ending(None));
        assert_eq!(decade.sample_count, 2);
        assert_relative_eq!(decade.precipitation, 20.0);
        assert_eq!(decade.temperature.mean, 0.0);
    }

    #[test]
    fn test_decade_of_nothing_does_not_fail() {
        let decade = analyze_decade(&[], &week_ending(None));
        assert_eq!(decade.sample_count, 0);
        assert_eq!(decade.period_end, None);
    }
}
