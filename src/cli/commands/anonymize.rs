//! Anonymize command implementation
//!
//! Pseudonymizes a text or JSON file for one identity. The CLI keeps no
//! database: pass `--mappings` to continue from an earlier bundle and
//! `--mappings-out` to save the identity's mappings for `deanonymize`.

use super::{
    build_service, load_settings, report_error, ContextArgs, EXIT_INVALID_INPUT, EXIT_SUCCESS,
};
use crate::anonymization::store::MappingStore;
use crate::cli::bundle::MappingBundle;
use crate::domain::{HarborError, IdentityKey};
use anyhow::Context;
use clap::Args;
use std::fs;
use std::path::PathBuf;

/// Arguments for the anonymize command
#[derive(Args, Debug)]
pub struct AnonymizeArgs {
    /// File to anonymize
    pub input: PathBuf,

    /// External identity the values belong to
    #[arg(long)]
    pub identity: String,

    /// Identity type (e.g. email, mrn)
    #[arg(long)]
    pub identity_type: String,

    /// Treat the input as a JSON document
    #[arg(long)]
    pub json: bool,

    /// Write the result here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Existing mappings bundle to reuse
    #[arg(long)]
    pub mappings: Option<PathBuf>,

    /// Write the identity's mappings bundle here
    #[arg(long)]
    pub mappings_out: Option<PathBuf>,

    #[command(flatten)]
    pub context: ContextArgs,
}

impl AnonymizeArgs {
    /// Execute the anonymize command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(input = %self.input.display(), json = self.json, "Running anonymization");

        let key = match IdentityKey::new(&self.identity, &self.identity_type) {
            Ok(key) => key,
            Err(e) => {
                return Ok(report_error("Invalid identity", &HarborError::InvalidInput(e)));
            }
        };
        let config = match load_settings(config_path) {
            Ok(c) => c,
            Err(e) => return Ok(report_error("Failed to load configuration", &e)),
        };
        let (service, store) = match build_service(&config) {
            Ok(s) => s,
            Err(e) => return Ok(report_error("Failed to initialize pseudonymizer", &e)),
        };

        if let Some(ref path) = self.mappings {
            let bundle = MappingBundle::read(path)?;
            if bundle.identity.key != key {
                eprintln!("❌ Mappings bundle belongs to a different identity");
                return Ok(EXIT_INVALID_INPUT);
            }
            let imported = bundle.import_into(&store).await;
            tracing::info!(imported, "Imported existing mappings");
        }

        let input = fs::read_to_string(&self.input)
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let context = self.context.to_context();

        let result = if self.json {
            service.anonymize_json_str(&key, &input, &context).await
        } else {
            service.anonymize_text(&key, &input, &context).await
        };
        let anonymized = match result {
            Ok(a) => a,
            Err(e) => return Ok(report_error("Anonymization failed", &e)),
        };

        match self.output {
            Some(ref path) => fs::write(path, &anonymized.value)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{}", anonymized.value),
        }

        eprintln!(
            "✅ Replaced {} value(s), {} new mapping(s)",
            anonymized.entity_count, anonymized.mappings_created
        );

        if let Some(ref path) = self.mappings_out {
            let Some(identity) = store.identity_record(&key).await else {
                eprintln!("ℹ️  Nothing detected, no mappings bundle written");
                return Ok(EXIT_SUCCESS);
            };
            let mappings = match store.find_all(identity.identity_id).await {
                Ok(m) => m,
                Err(e) => {
                    return Ok(report_error(
                        "Failed to export mappings",
                        &HarborError::from(e),
                    ));
                }
            };
            MappingBundle { identity, mappings }.write(path)?;
            eprintln!("💾 Mappings bundle written to {}", path.display());
        }

        Ok(EXIT_SUCCESS)
    }
}
