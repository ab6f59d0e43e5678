//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Harbor configuration file.

use super::{EXIT_CONFIG, EXIT_SUCCESS};
use crate::anonymization::compliance::hipaa::hipaa_identifiers;
use crate::anonymization::Pseudonymizer;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // load_config validates as its last step
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        // The pattern library is only compiled when the core is built
        let core = match Pseudonymizer::from_config(&config.anonymization) {
            Ok(core) => core,
            Err(e) => {
                println!("❌ Pattern library could not be loaded");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let anonymization = &config.anonymization;
        println!();
        println!("Configuration Summary:");
        println!("  Log Level: {}", config.application.log_level);
        println!("  Pattern Library: {}", core.detector().version());
        println!("  Identifier Categories: {}", hipaa_identifiers().len());
        println!(
            "  Confidence Threshold: {:.2}",
            anonymization.detection.confidence_threshold
        );
        println!("  Age Threshold: {}", anonymization.safe_harbor.age_threshold);
        println!(
            "  Restricted ZIP Prefixes: {}",
            anonymization.safe_harbor.restricted_zip_prefixes.len()
        );
        println!(
            "  Provider Exemption: {}",
            anonymization.safe_harbor.preserve_provider_names
        );
        println!("  Consent Enforced: {}", anonymization.consent.enforce);
        if anonymization.audit.enabled {
            println!("  Audit Log: {}", anonymization.audit.log_path.display());
        } else {
            println!("  Audit Log: disabled");
        }
        if config.logging.local_enabled {
            println!(
                "  File Logging: {} ({:?})",
                config.logging.local_path.display(),
                config.logging.local_rotation
            );
        }
        println!();
        Ok(EXIT_SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_valid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[anonymization.audit]\nenabled = false").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), EXIT_SUCCESS);
    }

    #[tokio::test]
    async fn test_invalid_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[anonymization.detection]\nconfidence_threshold = 3.0").unwrap();
        let path = file.path().to_string_lossy().to_string();
        assert_eq!(ValidateArgs {}.execute(&path).await.unwrap(), EXIT_CONFIG);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = ValidateArgs {}.execute("/nonexistent/harbor.toml").await;
        assert_eq!(result.unwrap(), EXIT_CONFIG);
    }
}
