//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes defining commands, parsing arguments, rendering console output (tables, spinners)
//! and the interactive prompts used by the menu.

mod commands;
mod prompts;

pub use commands::*;
pub use prompts::*;
