//! Domain error types
//!
//! This module defines the error hierarchy for Harbor. Collaborator failures
//! are kept in their own [`StoreError`] type and surface to callers as
//! [`HarborError::UnavailableDependency`].

use thiserror::Error;

/// Main Harbor error type
///
/// This is the primary error type returned by every public operation.
#[derive(Debug, Error)]
pub enum HarborError {
    /// Caller supplied input that cannot be processed (e.g. malformed JSON)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A persistence or audit collaborator failed
    #[error("Dependency unavailable: {0}")]
    UnavailableDependency(String),

    /// The request did not carry a recognised processing purpose
    #[error("Consent denied: {0}")]
    ConsentDenied(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Pattern library could not be loaded
    #[error("Pattern library error: {0}")]
    PatternLibrary(String),

    /// Audit sink failures
    #[error("Audit error: {0}")]
    Audit(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl HarborError {
    /// Short machine-readable kind, used in audit records
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::UnavailableDependency(_) => "unavailable_dependency",
            Self::ConsentDenied(_) => "consent_denied",
            Self::Configuration(_) => "configuration",
            Self::PatternLibrary(_) => "pattern_library",
            Self::Audit(_) => "audit",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
        }
    }
}

/// Errors raised by identity, mapping and operation-log collaborators
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend cannot be reached or refused the request
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Backend rejected a write because of conflicting state
    #[error("store conflict: {0}")]
    Conflict(String),

    /// Backend returned data that violates its own invariants
    #[error("corrupted store data: {0}")]
    Corrupted(String),
}

impl From<StoreError> for HarborError {
    fn from(err: StoreError) -> Self {
        HarborError::UnavailableDependency(err.to_string())
    }
}

impl From<std::io::Error> for HarborError {
    fn from(err: std::io::Error) -> Self {
        HarborError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for HarborError {
    fn from(err: serde_json::Error) -> Self {
        HarborError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for HarborError {
    fn from(err: toml::de::Error) -> Self {
        HarborError::Configuration(format!("TOML parsing error: {err}"))
    }
}
