//! Provides clients and utilities for fetching weather and air-quality series.
//!
//! Includes:
//! - `open_meteo`: the `WeatherSource` trait and the Open-Meteo HTTP client.
//! - `mock`: a deterministic synthetic source used offline and in tests.

mod mock;
mod open_meteo;

pub use mock::*;
pub use open_meteo::*;
