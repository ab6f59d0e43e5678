//! Anonymization configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// HIPAA Safe Harbor three-digit ZIP prefixes covering fewer than 20,000 people
pub const RESTRICTED_ZIP_PREFIXES: [&str; 17] = [
    "036", "059", "063", "102", "203", "556", "692", "790", "821", "823", "830", "831", "878",
    "879", "884", "890", "893",
];

/// Anonymization configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnonymizationConfig {
    /// Detection settings
    #[serde(default)]
    pub detection: DetectionConfig,

    /// Safe Harbor value transforms
    #[serde(default)]
    pub safe_harbor: SafeHarborConfig,

    /// Processing-purpose checks
    #[serde(default)]
    pub consent: ConsentConfig,

    /// Audit logging configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

impl AnonymizationConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.detection
            .validate()
            .context("Invalid detection configuration")?;
        self.safe_harbor
            .validate()
            .context("Invalid safe_harbor configuration")?;
        self.consent
            .validate()
            .context("Invalid consent configuration")?;
        self.audit.validate().context("Invalid audit configuration")?;
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_CONFIDENCE_THRESHOLD") {
            self.detection.confidence_threshold = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_CONFIDENCE_THRESHOLD value")?;
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_PATTERN_LIBRARY") {
            self.detection.pattern_library = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_AGE_THRESHOLD") {
            self.safe_harbor.age_threshold = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_AGE_THRESHOLD value")?;
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_PRESERVE_PROVIDER_NAMES") {
            self.safe_harbor.preserve_provider_names = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_PRESERVE_PROVIDER_NAMES value")?;
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_CONSENT_ENFORCE") {
            self.consent.enforce = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_CONSENT_ENFORCE value")?;
        }

        self.audit.apply_env_overrides()?;

        Ok(())
    }
}

/// Detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Candidates scoring below this are dropped
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f32,

    /// Path to a pattern library TOML file replacing the built-in one
    #[serde(default)]
    pub pattern_library: Option<PathBuf>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_confidence_threshold(),
            pattern_library: None,
        }
    }
}

impl DetectionConfig {
    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "confidence_threshold must be between 0.0 and 1.0, got {}",
                self.confidence_threshold
            );
        }

        if let Some(ref path) = self.pattern_library {
            if !path.exists() {
                anyhow::bail!("Pattern library file not found: {}", path.display());
            }
            if path.extension().and_then(|s| s.to_str()) != Some("toml") {
                anyhow::bail!("Pattern library must be a TOML file: {}", path.display());
            }
        }
        Ok(())
    }
}

/// Safe Harbor value transforms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeHarborConfig {
    /// Ages strictly above this are generalized
    #[serde(default = "default_age_threshold")]
    pub age_threshold: u32,

    /// Three-digit ZIP prefixes that are fully suppressed
    #[serde(default = "default_restricted_zip_prefixes")]
    pub restricted_zip_prefixes: Vec<String>,

    /// chrono formats tried, in order, when generalizing dates
    #[serde(default = "default_date_formats")]
    pub date_formats: Vec<String>,

    /// Exempt names qualified by a professional title
    #[serde(default = "default_true")]
    pub preserve_provider_names: bool,
}

impl Default for SafeHarborConfig {
    fn default() -> Self {
        Self {
            age_threshold: default_age_threshold(),
            restricted_zip_prefixes: default_restricted_zip_prefixes(),
            date_formats: default_date_formats(),
            preserve_provider_names: true,
        }
    }
}

impl SafeHarborConfig {
    fn validate(&self) -> Result<()> {
        if let Some(bad) = self
            .restricted_zip_prefixes
            .iter()
            .find(|p| p.len() != 3 || !p.chars().all(|c| c.is_ascii_digit()))
        {
            anyhow::bail!("Restricted ZIP prefix must be three digits: '{bad}'");
        }
        if self.date_formats.is_empty() {
            anyhow::bail!("At least one date format is required");
        }
        Ok(())
    }
}

/// Processing-purpose checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsentConfig {
    /// Reject requests without a recognised purpose
    #[serde(default)]
    pub enforce: bool,

    /// Purposes accepted when `enforce` is set
    #[serde(default = "default_allowed_purposes")]
    pub allowed_purposes: Vec<String>,

    /// Legal basis recorded in operation metadata
    #[serde(default = "default_legal_basis")]
    pub legal_basis: String,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            enforce: false,
            allowed_purposes: default_allowed_purposes(),
            legal_basis: default_legal_basis(),
        }
    }
}

impl ConsentConfig {
    fn validate(&self) -> Result<()> {
        if self.enforce && self.allowed_purposes.is_empty() {
            anyhow::bail!("Consent enforcement requires at least one allowed purpose");
        }
        Ok(())
    }
}

/// Audit logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Enable audit logging
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Audit log file path
    #[serde(default = "default_audit_log_path")]
    pub log_path: PathBuf,

    /// Use JSON format for audit logs
    #[serde(default = "default_true")]
    pub json_format: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_path: default_audit_log_path(),
            json_format: true,
        }
    }
}

impl AuditConfig {
    /// Validate audit configuration
    pub fn validate(&self) -> Result<()> {
        if self.enabled && self.log_path.as_os_str().is_empty() {
            anyhow::bail!("Audit log path cannot be empty when audit is enabled");
        }
        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_AUDIT_ENABLED") {
            self.enabled = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_AUDIT_ENABLED value")?;
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_AUDIT_LOG_PATH") {
            self.log_path = PathBuf::from(val);
        }

        if let Ok(val) = std::env::var("HARBOR_ANONYMIZATION_AUDIT_JSON_FORMAT") {
            self.json_format = val
                .parse()
                .context("Invalid HARBOR_ANONYMIZATION_AUDIT_JSON_FORMAT value")?;
        }

        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_confidence_threshold() -> f32 {
    0.8
}

fn default_age_threshold() -> u32 {
    90
}

fn default_restricted_zip_prefixes() -> Vec<String> {
    RESTRICTED_ZIP_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_date_formats() -> Vec<String> {
    [
        "%d/%b/%Y", "%d/%m/%Y", "%Y-%m-%d", "%m/%d/%Y", "%m-%d-%Y", "%d-%m-%Y", "%m/%d/%y",
        "%B %d, %Y", "%B %d %Y", "%d %B %Y", "%d %B, %Y",
    ]
    .iter()
    .map(|f| f.to_string())
    .collect()
}

fn default_allowed_purposes() -> Vec<String> {
    ["healthcare_provision", "emergency_care", "quality_improvement"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}

fn default_legal_basis() -> String {
    "Article 9(2)(h)".to_string()
}

fn default_audit_log_path() -> PathBuf {
    PathBuf::from("./audit/harbor-audit.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnonymizationConfig::default();
        assert_eq!(config.detection.confidence_threshold, 0.8);
        assert_eq!(config.safe_harbor.age_threshold, 90);
        assert_eq!(config.safe_harbor.restricted_zip_prefixes.len(), 17);
        assert!(config.safe_harbor.preserve_provider_names);
        assert!(!config.consent.enforce);
        assert!(config.audit.enabled);
        assert!(config.audit.json_format);
    }

    #[test]
    fn test_config_validation() {
        let config = AnonymizationConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_threshold() {
        let mut config = AnonymizationConfig::default();
        config.detection.confidence_threshold = 1.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_zip_prefix() {
        let mut config = AnonymizationConfig::default();
        config.safe_harbor.restricted_zip_prefixes.push("12a".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_pattern_library() {
        let mut config = AnonymizationConfig::default();
        config.detection.pattern_library = Some(PathBuf::from("/nonexistent/patterns.toml"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_enforced_consent_requires_purposes() {
        let mut config = AnonymizationConfig::default();
        config.consent.enforce = true;
        config.consent.allowed_purposes.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial_section() {
        let config: AnonymizationConfig = toml::from_str(
            r#"
[safe_harbor]
age_threshold = 89
"#,
        )
        .unwrap();
        assert_eq!(config.safe_harbor.age_threshold, 89);
        assert_eq!(config.safe_harbor.date_formats.len(), 11);
        assert!(config.audit.enabled);
    }
}
