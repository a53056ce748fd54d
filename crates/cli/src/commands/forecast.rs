//! Forecast, retrain and self-test commands

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, ForecastPoint};
use crate::output::{
    color_action, color_confidence, color_risk, format_accuracy, format_probability, print_json,
    print_success, print_warning, OutputFormat,
};

/// Row for forecast table
#[derive(Tabled)]
struct ForecastRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Probability")]
    probability: String,
    #[tabled(rename = "Range")]
    range: String,
    #[tabled(rename = "Risk")]
    risk: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
}

fn forecast_table(points: &[ForecastPoint]) -> String {
    let rows: Vec<ForecastRow> = points
        .iter()
        .map(|p| ForecastRow {
            date: p.date.clone(),
            probability: format_probability(p.probability),
            range: format!(
                "{} - {}",
                format_probability(p.lower_bound),
                format_probability(p.upper_bound)
            ),
            risk: color_risk(&p.risk_level),
            confidence: color_confidence(&p.confidence),
        })
        .collect();

    tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string()
}

/// Show the suspension forecast and recommendation for a city
pub async fn show_forecast(
    client: &ApiClient,
    city: Option<String>,
    days: Option<usize>,
    force_retrain: bool,
    format: OutputFormat,
) -> Result<()> {
    let result = client
        .forecast(city.as_deref(), days, force_retrain)
        .await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{} {}", "Suspension forecast for".bold(), result.city.bold());
            if result.forecast.is_empty() {
                print_warning("No forecast days returned");
            } else {
                println!("{}", forecast_table(&result.forecast));
            }

            println!(
                "\n{} {}",
                "Action:".bold(),
                color_action(&result.recommendation.action)
            );
            println!("{}", result.recommendation.message);

            println!(
                "\nModel: AIC {:.2}, BIC {:.2}, {} days of history, accuracy {}",
                result.model_info.aic,
                result.model_info.bic,
                result.model_info.training_days,
                format_accuracy(result.accuracy.as_ref().map(|a| a.accuracy))
            );
        }
    }

    Ok(())
}

/// Force a retrain for a city
pub async fn retrain(client: &ApiClient, city: Option<String>, format: OutputFormat) -> Result<()> {
    let result = client.retrain(city.as_deref()).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&result.message);
            println!(
                "Trained at {} (AIC {:.2}, BIC {:.2}, {} days)",
                result.trained_at,
                result.model_info.aic,
                result.model_info.bic,
                result.model_info.training_days
            );
        }
    }

    Ok(())
}

/// Run the service's quick uncached self-test
pub async fn self_test(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.self_test().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success(&result.message);
            println!("{}", forecast_table(&result.sample_forecast));
        }
    }

    Ok(())
}
