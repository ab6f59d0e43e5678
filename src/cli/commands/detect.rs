//! Detect command implementation
//!
//! Prints a detection report for a file. Identifier values are never
//! printed, only their types, offsets and scores.

use super::{build_service, load_settings, report_error, ContextArgs, EXIT_SUCCESS};
use crate::anonymization::report::DetectionReport;
use anyhow::Context;
use clap::{Args, ValueEnum};
use std::fs;
use std::path::PathBuf;

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
}

/// Arguments for the detect command
#[derive(Args, Debug)]
pub struct DetectArgs {
    /// File to scan
    pub input: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    pub format: ReportFormat,

    #[command(flatten)]
    pub context: ContextArgs,
}

impl DetectArgs {
    /// Execute the detect command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), "Running detection");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(e) => return Ok(report_error("Failed to load configuration", &e)),
        };
        let (service, _store) = match build_service(&config) {
            Ok(s) => s,
            Err(e) => return Ok(report_error("Failed to initialize detector", &e)),
        };

        let text = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;

        let entities = match service.detect(&text, &self.context.to_context()).await {
            Ok(entities) => entities,
            Err(e) => return Ok(report_error("Detection failed", &e)),
        };

        let report = DetectionReport::new(service.core().detector().version(), &text, &entities);
        match self.format {
            ReportFormat::Console => println!("{}", report.format_console()),
            ReportFormat::Json => println!("{}", report.format_json()?),
        }
        Ok(EXIT_SUCCESS)
    }
}
