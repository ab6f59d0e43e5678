//! Deanonymize command implementation

use super::{build_service, load_settings, report_error, ContextArgs, EXIT_SUCCESS};
use crate::cli::bundle::MappingBundle;
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Arguments for the deanonymize command
#[derive(Args, Debug)]
pub struct DeanonymizeArgs {
    /// File produced by `harbor anonymize`
    pub input: PathBuf,

    /// Mappings bundle written by `harbor anonymize --mappings-out`
    #[arg(long)]
    pub mappings: PathBuf,

    /// Treat the input as a JSON document
    #[arg(long)]
    pub json: bool,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,
}

impl DeanonymizeArgs {
    /// Execute the deanonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), json = self.json, "Running deanonymization");

        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(e) => return Ok(report_error("Failed to load configuration", &e)),
        };
        let (service, store) = match build_service(&config) {
            Ok(s) => s,
            Err(e) => return Ok(report_error("Failed to initialize pseudonymizer", &e)),
        };

        let bundle = MappingBundle::read(&self.mappings)?;
        let key = bundle.identity.key.clone();
        bundle.import_into(&store).await;

        let input = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let context = self.context.to_context();

        let result = if self.json {
            service.deanonymize_json_str(&key, &input, &context).await
        } else {
            service.deanonymize_text(&key, &input, &context).await
        };
        let restored = match result {
            Ok(r) => r,
            Err(e) => return Ok(report_error("Deanonymization failed", &e)),
        };

        match self.output {
            Some(ref path) => fs::write(path, &restored.value)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{}", restored.value),
        }
        eprintln!("✅ Restored {} value(s)", restored.restored_count);
        Ok(EXIT_SUCCESS)
    }
}
