//! Audit logging
//!
//! The service calls an [`AuditLogger`] around every public operation:
//! `log_access` before any work, `log_success` after it, and `log_error` for
//! every failure before it propagates. Records are flat key/value maps;
//! identity values are hashed before any sink writes them.

pub mod file;
pub mod record;

pub use file::FileAuditLogger;
pub use record::AuditRecord;

use crate::anonymization::config::AuditConfig;
use crate::domain::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Compliance audit sink
#[async_trait]
pub trait AuditLogger: Send + Sync {
    /// Record an access attempt
    ///
    /// # Errors
    ///
    /// Returns [`HarborError::Audit`](crate::domain::HarborError::Audit) if
    /// the record cannot be written; the operation is then aborted.
    async fn log_access(&self, record: &AuditRecord) -> Result<()>;

    /// Record a completed operation
    ///
    /// # Errors
    ///
    /// Returns [`HarborError::Audit`](crate::domain::HarborError::Audit) if
    /// the record cannot be written.
    async fn log_success(&self, record: &AuditRecord) -> Result<()>;

    /// Record a failed operation
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written. Callers log and
    /// ignore it so the original failure is what propagates.
    async fn log_error(&self, record: &AuditRecord) -> Result<()>;
}

/// Audit sink emitting `tracing` events on the `harbor::audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditLogger;

#[async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log_access(&self, record: &AuditRecord) -> Result<()> {
        tracing::info!(target: "harbor::audit", record = %record.redacted(), "access");
        Ok(())
    }

    async fn log_success(&self, record: &AuditRecord) -> Result<()> {
        tracing::info!(target: "harbor::audit", record = %record.redacted(), "success");
        Ok(())
    }

    async fn log_error(&self, record: &AuditRecord) -> Result<()> {
        tracing::warn!(target: "harbor::audit", record = %record.redacted(), "error");
        Ok(())
    }
}

/// Audit sink that discards every record
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditLogger;

#[async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log_access(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }

    async fn log_success(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }

    async fn log_error(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }
}

/// Build the configured audit sink
///
/// # Errors
///
/// Returns an error if the audit log directory cannot be created.
pub fn create_audit_logger(config: &AuditConfig) -> Result<Arc<dyn AuditLogger>> {
    if !config.enabled {
        tracing::debug!("Audit logging disabled");
        return Ok(Arc::new(NoopAuditLogger));
    }
    let logger = FileAuditLogger::new(config.log_path.clone(), config.json_format)?;
    Ok(Arc::new(logger))
}
