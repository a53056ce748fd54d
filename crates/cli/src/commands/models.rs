//! Cached model listing

use anyhow::Result;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{format_accuracy, print_json, print_warning, OutputFormat};

/// Row for models table
#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "City")]
    city: String,
    #[tabled(rename = "Last Trained")]
    last_trained: String,
    #[tabled(rename = "Days")]
    training_days: usize,
    #[tabled(rename = "Accuracy")]
    accuracy: String,
    #[tabled(rename = "AIC")]
    aic: String,
    #[tabled(rename = "BIC")]
    bic: String,
}

/// List every location with a cached model
pub async fn show_models(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result = client.models().await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            if result.models.is_empty() {
                print_warning("No trained models cached yet");
                return Ok(());
            }

            let rows: Vec<ModelRow> = result
                .models
                .iter()
                .map(|m| ModelRow {
                    city: m.city.clone(),
                    last_trained: m.last_trained.clone(),
                    training_days: m.training_days,
                    accuracy: format_accuracy(m.accuracy),
                    aic: format!("{:.2}", m.aic),
                    bic: format!("{:.2}", m.bic),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} models", result.total_models);
        }
    }

    Ok(())
}
