//! Builds the context document handed to the chatbot, weather reflection included.

mod builder;
mod reflection;

pub use builder::*;
pub use reflection::*;
