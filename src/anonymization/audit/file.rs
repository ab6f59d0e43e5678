//! Append-only audit log file

use super::{AuditLogger, AuditRecord};
use crate::domain::{HarborError, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Audit logger writing one line per record
///
/// Lines are JSON objects or `[timestamp] key=value ...` plain text. Identity
/// values are always hashed.
#[derive(Debug, Clone)]
pub struct FileAuditLogger {
    log_path: PathBuf,
    json_format: bool,
}

impl FileAuditLogger {
    /// Create a logger, creating the parent directory if needed
    pub fn new(log_path: PathBuf, json_format: bool) -> Result<Self> {
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    HarborError::Audit(format!(
                        "Failed to create audit log directory {}: {e}",
                        parent.display()
                    ))
                })?;
            }
        }

        Ok(Self {
            log_path,
            json_format,
        })
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    fn write_entry(&self, record: &AuditRecord) -> Result<()> {
        let timestamp = Utc::now().to_rfc3339();
        let record = record.redacted();

        let line = if self.json_format {
            let mut fields = serde_json::Map::new();
            fields.insert("timestamp".to_string(), Value::String(timestamp));
            fields.extend(record.fields().clone());
            serde_json::to_string(&fields)
                .map_err(|e| HarborError::Audit(format!("Failed to serialize audit entry: {e}")))?
        } else {
            format!("[{timestamp}] {record}")
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(|e| {
                HarborError::Audit(format!(
                    "Failed to open audit log {}: {e}",
                    self.log_path.display()
                ))
            })?;
        writeln!(file, "{line}")
            .map_err(|e| HarborError::Audit(format!("Failed to write audit entry: {e}")))
    }
}

#[async_trait]
impl AuditLogger for FileAuditLogger {
    async fn log_access(&self, record: &AuditRecord) -> Result<()> {
        self.write_entry(record)
    }

    async fn log_success(&self, record: &AuditRecord) -> Result<()> {
        self.write_entry(record)
    }

    async fn log_error(&self, record: &AuditRecord) -> Result<()> {
        self.write_entry(record)
    }
}
