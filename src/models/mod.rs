//! Defines the data structures and models used throughout the application.
//!
//! This includes the ingestion schema for weather API responses, the static reference
//! records about trees and places, the derived climate summaries, and the context document.

mod climate;
mod context;
mod open_meteo;
mod records;

pub use climate::*;
pub use context::*;
pub use open_meteo::*;
pub use records::*;
