//! Interactive prompts used by the menu when no subcommand is given.

use super::{validate_coordinates, ContextArgs, ImpactArgs, WeatherArgs};
use crate::error::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input};
use std::path::PathBuf;

fn prompt_text(prompt: &str, allow_empty: bool) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(allow_empty)
        .interact_text()?;
    Ok(value.trim().to_string())
}

fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>> {
    let value = prompt_text(&format!("{} (vuoto per saltare)", prompt), true)?;
    Ok(if value.is_empty() {
        None
    } else {
        Some(PathBuf::from(value))
    })
}

fn prompt_number(prompt: &str) -> Result<f64> {
    let value: f64 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .validate_with(|v: &f64| -> std::result::Result<(), &str> {
            if v.is_finite() {
                Ok(())
            } else {
                Err("Inserisci un numero valido")
            }
        })
        .interact_text()?;
    Ok(value)
}

/// Asks for the record files of a context build.
pub fn prompt_context() -> Result<ContextArgs> {
    let tree = PathBuf::from(prompt_text("File JSON dell'albero", false)?);
    let species = prompt_optional_path("File JSON della specie")?;
    let locations = prompt_optional_path("File JSON dei comuni")?;
    let pollutants = prompt_optional_path("File JSON della tabella inquinanti")?;
    let no_weather = !Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Includere il racconto meteo?")
        .default(true)
        .interact()?;

    Ok(ContextArgs {
        tree,
        species,
        locations,
        pollutants,
        no_weather,
        json: false,
    })
}

/// Asks for a pair of coordinates, re-asking until they are in range.
pub fn prompt_coordinates() -> Result<WeatherArgs> {
    loop {
        let latitude = prompt_number("Latitudine")?;
        let longitude = prompt_number("Longitudine")?;
        match validate_coordinates(latitude, longitude) {
            Ok(()) => return Ok(WeatherArgs { latitude, longitude }),
            Err(e) => println!("{}", e),
        }
    }
}

/// Asks for the inputs of a single impact sentence.
pub fn prompt_impact() -> Result<ImpactArgs> {
    let pollutant = prompt_text("Inquinante (CO2, PM10, O3, NO2, SO2)", false)?;
    let value = prompt_number("Quantità abbattuta in un anno")?;
    let unit: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Unità")
        .default("kg".to_string())
        .interact_text()?;
    let table = PathBuf::from(prompt_text("File JSON della tabella inquinanti", false)?);

    Ok(ImpactArgs {
        pollutant,
        value,
        unit: unit.trim().to_string(),
        table,
    })
}
