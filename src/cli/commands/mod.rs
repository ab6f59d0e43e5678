//! CLI command implementations
//!
//! This module contains all CLI command implementations. Handlers return the
//! process exit code:
//! - 0: success
//! - 2: configuration error
//! - 3: invalid input or refused request
//! - 5: fatal error

pub mod anonymize;
pub mod deanonymize;
pub mod detect;
pub mod init;
pub mod validate;

use crate::anonymization::models::RequestContext;
use crate::anonymization::store::MemoryStore;
use crate::anonymization::PseudonymizationService;
use crate::config::{load_config, load_config_str, HarborConfig};
use crate::domain::{HarborError, Result};
use clap::Args;
use std::path::Path;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG: i32 = 2;
pub const EXIT_INVALID_INPUT: i32 = 3;
pub const EXIT_FATAL: i32 = 5;

/// Request context flags shared by the data commands
#[derive(Args, Debug, Clone, Default)]
pub struct ContextArgs {
    /// Processing purpose (checked when consent enforcement is on)
    #[arg(long)]
    pub purpose: Option<String>,

    /// Reason recorded in the audit trail
    #[arg(long)]
    pub access_reason: Option<String>,

    /// Principal that authorized the request
    #[arg(long)]
    pub authorized_by: Option<String>,
}

impl ContextArgs {
    pub fn to_context(&self) -> RequestContext {
        RequestContext {
            purpose: self.purpose.clone(),
            access_reason: self.access_reason.clone(),
            authorized_by: self.authorized_by.clone(),
        }
    }
}

/// Load `config_path`, or the defaults when the file does not exist
///
/// Environment overrides apply in both cases.
pub fn load_settings(config_path: &str) -> Result<HarborConfig> {
    if Path::new(config_path).exists() {
        load_config(config_path)
    } else {
        tracing::debug!(config_path = %config_path, "No configuration file, using defaults");
        load_config_str("")
    }
}

/// Build a service over a fresh in-memory store
pub fn build_service(config: &HarborConfig) -> Result<(PseudonymizationService, Arc<MemoryStore>)> {
    let store = Arc::new(MemoryStore::new());
    let service = PseudonymizationService::from_config(&config.anonymization, store.clone())?;
    Ok((service, store))
}

/// Exit code for a library error
pub fn exit_code(error: &HarborError) -> i32 {
    match error {
        HarborError::Configuration(_) | HarborError::PatternLibrary(_) => EXIT_CONFIG,
        HarborError::InvalidInput(_) | HarborError::ConsentDenied(_) => EXIT_INVALID_INPUT,
        _ => EXIT_FATAL,
    }
}

/// Print a library error and return its exit code
pub fn report_error(action: &str, error: &HarborError) -> i32 {
    eprintln!("❌ {action}");
    eprintln!("   Error: {error}");
    exit_code(error)
}
