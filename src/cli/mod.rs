//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Harbor using clap.

pub mod bundle;
pub mod commands;

use clap::{Parser, Subcommand};

/// Harbor - PHI detection and reversible pseudonymization
#[derive(Parser, Debug)]
#[command(name = "harbor")]
#[command(version, about, long_about = None)]
#[command(author = "Harbor Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "harbor.toml", env = "HARBOR_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HARBOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report identifiers found in a file without changing it
    Detect(commands::detect::DetectArgs),

    /// Pseudonymize a text or JSON file for one identity
    Anonymize(commands::anonymize::AnonymizeArgs),

    /// Restore original values using an exported mappings bundle
    Deanonymize(commands::deanonymize::DeanonymizeArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
