use albero_context::cli::{self, App, Cli, Commands};
use albero_context::error::Result;
use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Select};
use std::env;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sends logs to stderr, or to a daily-rolling JSON file under `ALBERO_LOG_DIR` when set.
///
/// The returned guard must stay alive for buffered file logs to be flushed.
fn init_logging() -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match env::var("ALBERO_LOG_DIR").ok().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::daily(dir, "albero-context.log");
            let (writer, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(writer).with_ansi(false))
                .init();
            Some(guard)
        },
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
            None
        },
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let _guard = init_logging();
    let cli = Cli::parse();

    info!("Initializing tree context builder...");
    let app = match App::new(cli.offline, cli.seed) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to initialize application: {:?}", e);
            println!(
                "{}",
                "Error: Failed to initialize application. Check logs.".red()
            );
            return Err(e);
        },
    };

    if let Some(command) = cli.command {
        return app.run_command(command).await;
    }

    println!("{}", "Benvenuto! Raccontiamo un albero monumentale.".cyan().bold());

    loop {
        let options = &[
            "Costruisci il contesto di un albero",
            "Racconto meteo per coordinate",
            "Frase di impatto ecologico",
            "Esci",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Cosa vuoi fare?")
            .items(options)
            .default(0)
            .interact_opt()?
            .unwrap_or(options.len() - 1);

        println!("\n---\n");

        let command = match selection {
            0 => cli::prompt_context().map(Commands::Context),
            1 => cli::prompt_coordinates().map(Commands::Weather),
            2 => cli::prompt_impact().map(Commands::Impact),
            _ => {
                println!("{}", "Arrivederci!".green());
                break;
            },
        };

        let result = match command {
            Ok(command) => app.run_command(command).await,
            Err(e) => {
                println!("{} {}", "Input non valido:".red(), e);
                continue;
            },
        };

        if let Err(e) = result {
            error!("Command execution failed: {:?}", e);
            println!("{} {}", "Errore:".red(), e.to_string().red());
        }

        println!("\n---\n");
    }

    Ok(())
}
