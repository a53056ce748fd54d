//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Pretty-print any response as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a probability in [0, 1] as a percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.0}%", probability * 100.0)
}

/// Format an optional backtest accuracy
pub fn format_accuracy(accuracy: Option<f64>) -> String {
    match accuracy {
        Some(a) => format_probability(a),
        None => "n/a".dimmed().to_string(),
    }
}

/// Color a risk level by severity
pub fn color_risk(level: &str) -> String {
    match level {
        "critical" => level.red().bold().to_string(),
        "high" => level.red().to_string(),
        "moderate" => level.yellow().to_string(),
        "low" => level.green().to_string(),
        _ => level.to_string(),
    }
}

/// Color a recommended action by urgency
pub fn color_action(action: &str) -> String {
    match action {
        "issue_now" => action.red().bold().to_string(),
        "prepare" => action.red().to_string(),
        "monitor_closely" => action.yellow().to_string(),
        "monitor" => action.green().to_string(),
        _ => action.to_string(),
    }
}

/// Color a confidence band
pub fn color_confidence(band: &str) -> String {
    match band {
        "high" => band.green().to_string(),
        "medium" => band.yellow().to_string(),
        "low" => band.red().to_string(),
        _ => band.to_string(),
    }
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "success" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "error" => status.red().to_string(),
        _ => status.to_string(),
    }
}
