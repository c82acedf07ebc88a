//! Runtime configuration loaded from the environment (and `.env`, when present).

use crate::analysis::TrendThresholds;
use crate::error::{AppError, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const DEFAULT_AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
pub const DEFAULT_TIMEZONE: &str = "Europe/Rome";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub forecast_url: String,
    pub air_quality_url: String,
    pub archive_url: String,
    /// IANA timezone sent with every weather query.
    pub timezone: String,
    pub http_timeout: Duration,
    pub thresholds: TrendThresholds,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            air_quality_url: DEFAULT_AIR_QUALITY_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            thresholds: TrendThresholds::default(),
        }
    }
}

impl Config {
    /// Loads `.env` and reads every setting, falling back to the defaults.
    ///
    /// A variable that is set but cannot be parsed is an error rather than silently ignored.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let mut thresholds = defaults.thresholds;
        override_with(&mut thresholds.rain_year_high_ratio, "TREND_RAIN_YEAR_HIGH_RATIO")?;
        override_with(&mut thresholds.rain_year_low_ratio, "TREND_RAIN_YEAR_LOW_RATIO")?;
        override_with(&mut thresholds.rain_decade_high_ratio, "TREND_RAIN_DECADE_HIGH_RATIO")?;
        override_with(&mut thresholds.rain_decade_low_ratio, "TREND_RAIN_DECADE_LOW_RATIO")?;
        override_with(&mut thresholds.temperature_year_delta, "TREND_TEMPERATURE_YEAR_DELTA")?;
        override_with(&mut thresholds.temperature_decade_delta, "TREND_TEMPERATURE_DECADE_DELTA")?;

        let mut timeout_secs = DEFAULT_HTTP_TIMEOUT_SECS;
        override_with(&mut timeout_secs, "HTTP_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            return Err(AppError::Config(
                "HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let config = Self {
            forecast_url: string_or("OPEN_METEO_FORECAST_URL", defaults.forecast_url)?,
            air_quality_url: string_or("OPEN_METEO_AIR_QUALITY_URL", defaults.air_quality_url)?,
            archive_url: string_or("OPEN_METEO_ARCHIVE_URL", defaults.archive_url)?,
            timezone: string_or("OPEN_METEO_TIMEZONE", defaults.timezone)?,
            http_timeout: Duration::from_secs(timeout_secs),
            thresholds,
        };
        debug!("Loaded configuration: {:?}", config);
        Ok(config)
    }
}

/// The trimmed value of `key`; unset and blank both read as `None`.
///
/// A value that is not valid Unicode is an `AppError::Env`.
fn read_var(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(value) => {
            let value = value.trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        },
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => {
            debug!("Unreadable value for {}: {}", key, e);
            Err(AppError::from(e))
        },
    }
}

fn string_or(key: &str, default: String) -> Result<String> {
    Ok(read_var(key)?.unwrap_or(default))
}

fn override_with<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = read_var(key)? else {
        return Ok(());
    };
    *target = raw
        .parse()
        .map_err(|e| AppError::Config(format!("invalid value '{}' for {}: {}", raw, key, e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: &[&str] = &[
        "OPEN_METEO_FORECAST_URL",
        "OPEN_METEO_AIR_QUALITY_URL",
        "OPEN_METEO_ARCHIVE_URL",
        "OPEN_METEO_TIMEZONE",
        "HTTP_TIMEOUT_SECS",
        "TREND_RAIN_YEAR_HIGH_RATIO",
        "TREND_RAIN_YEAR_LOW_RATIO",
        "TREND_RAIN_DECADE_HIGH_RATIO",
        "TREND_RAIN_DECADE_LOW_RATIO",
        "TREND_TEMPERATURE_YEAR_DELTA",
        "TREND_TEMPERATURE_DECADE_DELTA",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_defaults_without_environment() {
        clear_env();
        let config = Config::from_env().unwrap();
        assert_eq!(config.forecast_url, DEFAULT_FORECAST_URL);
        assert_eq!(config.timezone, "Europe/Rome");
        assert_eq!(config.http_timeout, Duration::from_secs(20));
        assert_eq!(config.thresholds, TrendThresholds::default());
    }

    #[test]
    #[serial]
    fn test_overrides_are_applied() {
        clear_env();
        env::set_var("OPEN_METEO_TIMEZONE", "UTC");
        env::set_var("OPEN_METEO_ARCHIVE_URL", "http://localhost:9000/archive");
        env::set_var("HTTP_TIMEOUT_SECS", "5");
        env::set_var("TREND_RAIN_YEAR_HIGH_RATIO", "2.5");
        env::set_var("TREND_TEMPERATURE_DECADE_DELTA", " 1 ");

        let config = Config::from_env().unwrap();
        assert_eq!(config.timezone, "UTC");
        assert_eq!(config.archive_url, "http://localhost:9000/archive");
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.thresholds.rain_year_high_ratio, 2.5);
        assert_eq!(config.thresholds.temperature_decade_delta, 1.0);
        assert_eq!(config.thresholds.rain_year_low_ratio, 0.3);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_value_is_a_config_error() {
        clear_env();
        env::set_var("TREND_RAIN_DECADE_LOW_RATIO", "un quarto");
        match Config::from_env() {
            Err(AppError::Config(msg)) => assert!(msg.contains("TREND_RAIN_DECADE_LOW_RATIO")),
            other => panic!("Expected a config error, got {:?}", other),
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_timeout_is_rejected() {
        clear_env();
        env::set_var("HTTP_TIMEOUT_SECS", "0");
        assert!(matches!(Config::from_env(), Err(AppError::Config(_))));
        clear_env();
    }

    #[cfg(unix)]
    #[test]
    #[serial]
    fn test_non_unicode_value_is_an_env_error() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        clear_env();
        env::set_var("OPEN_METEO_TIMEZONE", OsStr::from_bytes(b"Europe/R\xffme"));
        assert!(matches!(
            Config::from_env(),
            Err(AppError::Env(env::VarError::NotUnicode(_)))
        ));
        clear_env();
    }
}
