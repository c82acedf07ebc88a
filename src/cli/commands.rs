use crate::api::{MockWeatherProvider, OpenMeteoClient, WeatherSource};
use crate::config::Config;
use crate::context::{build_offline, ContextBuilder, WeatherReflection};
use crate::error::{AppError, Result};
use crate::models::{
    ClimateWindow, ContextDocument, LocationRecord, PollutantRecord, Quantity, SpeciesRecord,
    TreeRecord,
};
use crate::narrative::{format_number, generate_impact_sentence};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

/// Seed of the synthetic weather source when `--offline` is given without `--seed`.
pub const DEFAULT_OFFLINE_SEED: u64 = 2024;

/// Context builder for monumental trees: weather narrative, ecology and place data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Use the deterministic synthetic weather source instead of Open-Meteo
    #[arg(long, global = true)]
    pub offline: bool,

    /// Seed for sentence selection (and for the synthetic weather source)
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Without a subcommand an interactive menu is shown
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Build the context document of a tree from JSON record files
    Context(ContextArgs),

    /// Print the weather reflection and the climate windows for a location
    Weather(WeatherArgs),

    /// Render one pollution impact sentence from a pollutant table
    Impact(ImpactArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ContextArgs {
    /// JSON file holding one tree record
    #[arg(short, long)]
    pub tree: PathBuf,

    /// JSON file holding the species record
    #[arg(short, long)]
    pub species: Option<PathBuf>,

    /// JSON file holding an array of municipality records
    #[arg(short, long)]
    pub locations: Option<PathBuf>,

    /// JSON file holding an array of pollutant table rows
    #[arg(short, long)]
    pub pollutants: Option<PathBuf>,

    /// Skip the weather reflection entirely
    #[arg(long)]
    pub no_weather: bool,

    /// Print the structured document as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct WeatherArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub latitude: f64,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true)]
    pub longitude: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ImpactArgs {
    /// Pollutant code (CO2, PM10, O3, NO2, SO2; subscripts accepted)
    #[arg(short = 'c', long)]
    pub pollutant: String,

    /// Yearly abatement of the tree
    #[arg(short, long)]
    pub value: f64,

    /// Unit of the abatement value
    #[arg(short, long, default_value = "kg")]
    pub unit: String,

    /// JSON file holding an array of pollutant table rows
    #[arg(short, long)]
    pub table: PathBuf,
}

/// CLI application
pub struct App {
    builder: ContextBuilder<Box<dyn WeatherSource>>,
}

impl App {
    /// Creates the application from the environment configuration.
    pub fn new(offline: bool, seed: Option<u64>) -> Result<Self> {
        let config = Config::from_env()?;

        let source: Box<dyn WeatherSource> = if offline {
            info!("Offline mode: using the synthetic weather source");
            let today = Local::now().date_naive();
            Box::new(MockWeatherProvider::new(
                seed.unwrap_or(DEFAULT_OFFLINE_SEED),
                today,
            ))
        } else {
            info!("Using Open-Meteo at {}", config.forecast_url);
            Box::new(OpenMeteoClient::new(&config)?)
        };

        let mut builder = ContextBuilder::new(source).with_thresholds(config.thresholds);
        if let Some(seed) = seed {
            builder = builder.with_seed(seed);
        }
        Ok(Self { builder })
    }

    /// Creates the application around an existing builder.
    pub fn with_builder(builder: ContextBuilder<Box<dyn WeatherSource>>) -> Self {
        Self { builder }
    }

    /// Runs one command, printing its output to stdout.
    pub async fn run_command(&self, command: Commands) -> Result<()> {
        let output = match command {
            Commands::Context(args) => self.context(&args).await?,
            Commands::Weather(args) => self.weather(&args).await?,
            Commands::Impact(args) => self.impact(&args)?,
        };
        println!("{}", output);
        Ok(())
    }

    async fn context(&self, args: &ContextArgs) -> Result<String> {
        let tree: TreeRecord = load_json(&args.tree)?;
        let species: Option<SpeciesRecord> = args
            .species
            .as_deref()
            .map(load_json::<SpeciesRecord>)
            .transpose()?;
        let locations: Vec<LocationRecord> = load_optional_list(args.locations.as_deref())?;
        let pollutants: Vec<PollutantRecord> = load_optional_list(args.pollutants.as_deref())?;

        let document = if args.no_weather {
            let mut rng = self.builder.rng();
            build_offline(&tree, species.as_ref(), &locations, &pollutants, None, &mut rng)?
        } else {
            let spinner = spinner("Raccolgo i dati meteo e costruisco il contesto...")?;
            let result = self
                .builder
                .build_context(&tree, species.as_ref(), &locations, &pollutants)
                .await;
            spinner.finish_and_clear();
            result?
        };

        if args.json {
            Ok(serde_json::to_string_pretty(&document)?)
        } else {
            Ok(document_text(&document))
        }
    }

    async fn weather(&self, args: &WeatherArgs) -> Result<String> {
        validate_coordinates(args.latitude, args.longitude)?;

        let spinner = spinner("Interrogo le serie meteo...")?;
        let reflection = crate::context::reflect(
            self.builder.source(),
            args.latitude,
            args.longitude,
            self.builder.today(),
            self.builder.thresholds(),
        )
        .await;
        spinner.finish_and_clear();

        let reflection = reflection.ok_or_else(|| {
            error!(
                "No weather data available for ({}, {})",
                args.latitude, args.longitude
            );
            AppError::Cli("No weather data available for this location".to_string())
        })?;

        Ok(format!(
            "{}\n\n{}",
            windows_table(&reflection),
            reflection.text
        ))
    }

    fn impact(&self, args: &ImpactArgs) -> Result<String> {
        if !args.value.is_finite() || args.value <= 0.0 {
            return Err(AppError::Cli(format!(
                "Abatement value must be a positive number, got {}",
                args.value
            )));
        }
        let rows: Vec<PollutantRecord> = load_json(&args.table)?;
        let quantity = Quantity::new(args.value, args.unit.trim());
        let mut rng = self.builder.rng();

        match generate_impact_sentence(&args.pollutant, &quantity, &rows, &mut rng) {
            Some(sentence) => Ok(format!(
                "{}\n{}",
                sentence.text,
                format!("(fattore {})", format_number(sentence.factor, 2)).dimmed()
            )),
            None => Err(AppError::Cli(format!(
                "No usable table row for pollutant '{}'",
                args.pollutant
            ))),
        }
    }
}

/// Reads and deserializes a JSON file.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| {
        error!("Could not read {}: {}", path.display(), e);
        AppError::from(e)
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        error!("Could not parse {}: {}", path.display(), e);
        AppError::from(e)
    })
}

fn load_optional_list<T: DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    match path {
        Some(path) => load_json(path),
        None => Ok(Vec::new()),
    }
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<()> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(AppError::Cli(format!(
            "Invalid coordinates ({}, {}): latitude must be within ±90 and longitude within ±180",
            latitude, longitude
        )));
    }
    Ok(())
}

fn spinner(message: &'static str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Section headers highlighted, bodies as they are.
pub fn document_text(document: &ContextDocument) -> String {
    document
        .sections
        .iter()
        .map(|section| match section.content.split_once('\n') {
            Some((header, body)) => format!("{}\n{}", header.cyan().bold(), body),
            None => section.content.cyan().bold().to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One row per available climate window.
pub fn windows_table(reflection: &WeatherReflection) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "Finestra",
            "Fine periodo",
            "Campioni",
            "T media °C",
            "T min °C",
            "T max °C",
            "Pioggia mm",
            "Umidità %",
            "Vento km/h",
            "Pressione hPa",
            "Qualità aria",
        ]);

    let windows = [
        Some(&reflection.week),
        reflection.year.as_ref(),
        reflection.decade.as_ref(),
    ];
    for window in windows.into_iter().flatten() {
        table.add_row(window_row(window));
    }
    table
}

fn window_row(window: &ClimateWindow) -> Vec<Cell> {
    vec![
        Cell::new(window.kind),
        Cell::new(
            window
                .period_end
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        Cell::new(window.sample_count),
        Cell::new(format_number(window.temperature.mean, 1)),
        Cell::new(format_number(window.temperature.min, 1)),
        Cell::new(format_number(window.temperature.max, 1)),
        Cell::new(format_number(window.precipitation, 1)),
        Cell::new(format_number(window.humidity, 0)),
        Cell::new(format_number(window.wind.mean, 1)),
        Cell::new(format_number(window.pressure, 0)),
        Cell::new(
            window
                .air_quality_score
                .map(|s| format_number(s, 0))
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]
}
