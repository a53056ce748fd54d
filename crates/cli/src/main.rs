//! Suspension Forecaster CLI
//!
//! A command-line tool for querying suspension forecasts, inspecting cached
//! models and triggering retrains on a running forecast service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{forecast, health, models};
use std::process::ExitCode;

/// Suspension Forecaster CLI
#[derive(Parser)]
#[command(name = "sfc")]
#[command(author, version, about = "CLI for the Suspension Forecaster", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via SFC_API_URL env var)
    #[arg(long, env = "SFC_API_URL", default_value = "http://localhost:5000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service health
    Health,

    /// Show the suspension forecast for a city
    Forecast {
        /// City to forecast (service default if not specified)
        #[arg(long, short)]
        city: Option<String>,

        /// Number of forecast days to show
        #[arg(long, short)]
        days: Option<usize>,

        /// Retrain the model before forecasting
        #[arg(long)]
        force_retrain: bool,
    },

    /// List cached models
    Models,

    /// Force a model retrain for a city
    Retrain {
        /// City to retrain (service default if not specified)
        #[arg(long, short)]
        city: Option<String>,
    },

    /// Run the service's quick prediction self-test
    Test,
}

async fn run(cli: Cli) -> Result<()> {
    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Health => health::show_health(&client, cli.format).await,
        Commands::Forecast {
            city,
            days,
            force_retrain,
        } => forecast::show_forecast(&client, city, days, force_retrain, cli.format).await,
        Commands::Models => models::show_models(&client, cli.format).await,
        Commands::Retrain { city } => forecast::retrain(&client, city, cli.format).await,
        Commands::Test => forecast::self_test(&client, cli.format).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
