//! Subcommand implementations

pub mod forecast;
pub mod health;
pub mod models;
