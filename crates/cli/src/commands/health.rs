//! Service health command

use anyhow::Result;

use crate::client::ApiClient;
use crate::output::{color_status, print_info, print_json, OutputFormat};

/// Show service health and per-component status
pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let health = client.health().await?;

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Table => {
            println!("{}: {}", health.service, color_status(&health.status));
            for (name, component) in &health.components {
                match &component.message {
                    Some(message) => println!(
                        "  {:<10} {} ({})",
                        name,
                        color_status(&component.status),
                        message
                    ),
                    None => println!("  {:<10} {}", name, color_status(&component.status)),
                }
            }
            print_info(&format!("Checked at {}", health.timestamp));
        }
    }

    Ok(())
}
