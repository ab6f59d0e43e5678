//! Init command implementation
//!
//! This module implements the `init` command for generating a starter
//! configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_SUCCESS};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "harbor.toml")]
    pub output: String,

    /// Include every option with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing Harbor configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = if self.with_examples {
            Self::generate_config_with_examples()
        } else {
            Self::generate_minimal_config()
        };

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your settings", self.output);
                println!("  2. Validate configuration: harbor validate-config");
                println!("  3. Scan a file: harbor detect note.txt");
                println!();
                Ok(EXIT_SUCCESS)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate minimal configuration
    fn generate_minimal_config() -> String {
        r#"# Harbor Configuration File
# PHI detection and reversible pseudonymization

[application]
log_level = "info"

[anonymization.detection]
confidence_threshold = 0.8

[anonymization.safe_harbor]
age_threshold = 90
preserve_provider_names = true

[anonymization.consent]
enforce = false

[anonymization.audit]
enabled = true
log_path = "./audit/harbor-audit.log"
json_format = true

[logging]
local_enabled = false
local_path = "./logs"
local_rotation = "daily"
"#
        .to_string()
    }

    /// Generate configuration with examples and comments
    fn generate_config_with_examples() -> String {
        r#"# Harbor Configuration File
# PHI detection and reversible pseudonymization
#
# Every value below is the default; an empty file behaves the same.
# Values may reference environment variables as ${VAR_NAME}, and any key can
# be overridden with HARBOR_<SECTION>_<KEY> (for example
# HARBOR_ANONYMIZATION_AGE_THRESHOLD=89).

# ============================================================================
# Application Settings
# ============================================================================
[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Detection
# ============================================================================
[anonymization.detection]
# Candidates scoring below this are dropped (0.0 - 1.0)
confidence_threshold = 0.8

# Optional: replace the built-in pattern library
# pattern_library = "./patterns/custom_patterns.toml"

# ============================================================================
# HIPAA Safe Harbor
# ============================================================================
[anonymization.safe_harbor]
# Ages strictly above this become "<threshold> or older"
age_threshold = 90

# Three-digit ZIP prefixes that are replaced with 00000
restricted_zip_prefixes = [
    "036", "059", "063", "102", "203", "556", "692", "790", "821",
    "823", "830", "831", "878", "879", "884", "890", "893",
]

# Names qualified by a professional title (Dr., RN, MD, ...) are kept
preserve_provider_names = true

# chrono formats tried, in order, when generalizing dates to XX/XX/YYYY
date_formats = [
    "%d/%b/%Y", "%d/%m/%Y", "%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%d-%m-%Y",
    "%m/%d/%y", "%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d %B, %Y",
]

# ============================================================================
# Consent
# ============================================================================
[anonymization.consent]
# Reject requests without an allowed --purpose
enforce = false
allowed_purposes = ["healthcare_provision", "emergency_care", "quality_improvement"]

# Recorded with every operation
legal_basis = "Article 9(2)(h)"

# ============================================================================
# Audit Trail
# ============================================================================
[anonymization.audit]
enabled = true
log_path = "./audit/harbor-audit.log"

# JSON lines (true) or plain text (false)
json_format = true

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files in addition to console output
local_enabled = false
local_path = "./logs"

# daily | hourly
local_rotation = "daily"
"#
        .to_string()
    }
}
