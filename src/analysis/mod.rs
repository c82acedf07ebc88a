//! Numeric side of the pipeline: unit conversion, aggregates, climate windows and trends.

pub mod stats;
mod trends;
mod units;
mod windows;

pub use trends::*;
pub use units::*;
pub use windows::*;
