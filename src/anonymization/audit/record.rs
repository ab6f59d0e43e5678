//! Flat key/value audit records

use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fmt;

/// Fields holding raw identity values; hashed before writing
pub const SENSITIVE_FIELDS: [&str; 1] = ["identity"];

/// One audit event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditRecord {
    fields: Map<String, Value>,
}

impl AuditRecord {
    /// Start a record for `event`
    pub fn new(event: &str) -> Self {
        Self::default().with("event", event)
    }

    /// Add or replace a field
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Add a field only when `value` is present
    pub fn with_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Copy with every sensitive field replaced by `<field>_hash`
    pub fn redacted(&self) -> AuditRecord {
        let fields = self
            .fields
            .iter()
            .map(|(key, value)| {
                if SENSITIVE_FIELDS.contains(&key.as_str()) {
                    let plain = match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (format!("{key}_hash"), Value::String(hash_value(&plain)))
                } else {
                    (key.clone(), value.clone())
                }
            })
            .collect();
        AuditRecord { fields }
    }
}

impl fmt::Display for AuditRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self
            .fields
            .iter()
            .map(|(key, value)| match value {
                Value::String(s) => format!("{key}={s}"),
                other => format!("{key}={other}"),
            })
            .collect();
        f.write_str(&pairs.join(" "))
    }
}

/// SHA-256 hex digest of `value`
pub fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacted_hashes_identity() {
        let record = AuditRecord::new("access")
            .with("identity", "jane@example.org")
            .with("entity_count", 3);
        let redacted = record.redacted();

        assert!(redacted.get("identity").is_none());
        assert_eq!(
            redacted.get("identity_hash").and_then(Value::as_str),
            Some(hash_value("jane@example.org").as_str())
        );
        assert_eq!(redacted.get("entity_count"), Some(&Value::from(3)));
        assert!(!redacted.to_string().contains("jane@example.org"));
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(hash_value("a"), hash_value("a"));
        assert_ne!(hash_value("a"), hash_value("b"));
        assert_eq!(hash_value("a").len(), 64);
    }

    #[test]
    fn test_with_opt() {
        let record = AuditRecord::new("access")
            .with_opt("purpose", Some("emergency_care"))
            .with_opt("authorized_by", None::<String>);
        assert!(record.get("purpose").is_some());
        assert!(record.get("authorized_by").is_none());
    }
}
