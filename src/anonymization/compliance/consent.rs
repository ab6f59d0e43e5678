//! Processing-purpose validation

use crate::anonymization::config::ConsentConfig;
use crate::anonymization::models::RequestContext;
use crate::domain::{HarborError, Result};
use std::collections::HashSet;

/// Purpose check applied before an operation reads or writes PHI
#[derive(Debug, Clone)]
pub struct ConsentPolicy {
    enforce: bool,
    allowed_purposes: HashSet<String>,
    legal_basis: String,
}

impl ConsentPolicy {
    pub fn new(config: &ConsentConfig) -> Self {
        Self {
            enforce: config.enforce,
            allowed_purposes: config
                .allowed_purposes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .collect(),
            legal_basis: config.legal_basis.clone(),
        }
    }

    /// Policy that accepts every request
    pub fn permissive() -> Self {
        Self::new(&ConsentConfig::default())
    }

    /// Legal basis recorded with each operation
    pub fn legal_basis(&self) -> &str {
        &self.legal_basis
    }

    /// Reject the request if enforcement is on and its purpose is not allowed
    pub fn check(&self, context: &RequestContext) -> Result<()> {
        if !self.enforce {
            return Ok(());
        }

        match context.purpose.as_deref().map(str::trim) {
            None | Some("") => Err(HarborError::ConsentDenied(
                "no processing purpose supplied".to_string(),
            )),
            Some(purpose) if self.allowed_purposes.contains(&purpose.to_lowercase()) => Ok(()),
            Some(purpose) => Err(HarborError::ConsentDenied(format!(
                "purpose '{purpose}' is not permitted"
            ))),
        }
    }
}
