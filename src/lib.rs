//! Contextual narrative synthesis for monumental trees.
//!
//! Turns static tree, species, place and pollutant records plus live Open-Meteo series into an
//! ordered Italian context document for a chatbot grounding layer.

pub mod analysis;
pub mod api;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod narrative;
