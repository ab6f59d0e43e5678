//! Configuration management for Harbor
//!
//! Harbor reads a TOML file (`harbor.toml` by default) with support for:
//! - `${VAR_NAME}` environment variable substitution
//! - `HARBOR_<SECTION>_<KEY>` environment overrides
//! - defaults for every setting, so an empty file is valid
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//!
//! [anonymization.detection]
//! confidence_threshold = 0.8
//!
//! [anonymization.safe_harbor]
//! age_threshold = 90
//! preserve_provider_names = true
//!
//! [anonymization.consent]
//! enforce = true
//! allowed_purposes = ["healthcare_provision", "emergency_care"]
//!
//! [anonymization.audit]
//! log_path = "${HARBOR_AUDIT_DIR}/harbor-audit.log"
//!
//! [logging]
//! local_enabled = true
//! local_path = "./logs"
//! local_rotation = "daily"
//! ```
//!
//! Configuration is passed explicitly into constructors; nothing here is
//! global.

pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_str};
pub use schema::{ApplicationConfig, HarborConfig, LogRotation, LoggingConfig};
