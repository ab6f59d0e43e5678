//! Persistence collaborator traits
//!
//! The engine never owns persisted state. Identity, mapping and operation
//! records are reached through these traits for the duration of one
//! operation, and every stored record is treated as an append-only fact.

use crate::anonymization::models::{EntityType, PseudonymMapping};
use crate::domain::{IdentityId, IdentityKey, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Result type for collaborator calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Outcome of an insert-if-absent call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertOutcome {
    /// The canonical row for the mapping's natural key
    pub mapping: PseudonymMapping,

    /// Whether this call created the row
    pub was_new: bool,
}

/// Maps external identities to opaque identity ids
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Look up the identity, creating it on first use
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn resolve_or_create(&self, key: &IdentityKey) -> StoreResult<IdentityId>;

    /// Look up the identity without creating it
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` when the identity has never been seen.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn resolve_only(&self, key: &IdentityKey) -> StoreResult<Option<IdentityId>>;
}

/// Identity-scoped pseudonym mappings
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// All mappings stored for an identity
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn find_all(&self, identity_id: IdentityId) -> StoreResult<Vec<PseudonymMapping>>;

    /// Atomically insert `mapping` unless its natural key already exists
    ///
    /// The natural key is `(identity_id, entity_type, lowercase(original_value))`.
    /// When a row already exists it is returned unchanged with
    /// `was_new = false`; the proposed fake value is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn insert_if_absent(&self, mapping: PseudonymMapping) -> StoreResult<InsertOutcome>;

    /// Insert every proposal of one operation, returning the winning rows
    ///
    /// Outcomes are returned in input order. Backends with a native bulk
    /// upsert should override this.
    ///
    /// # Errors
    ///
    /// Returns the first backend error; earlier inserts are not rolled back.
    async fn insert_many_if_absent(
        &self,
        mappings: Vec<PseudonymMapping>,
    ) -> StoreResult<Vec<InsertOutcome>> {
        let mut outcomes = Vec::with_capacity(mappings.len());
        for mapping in mappings {
            outcomes.push(self.insert_if_absent(mapping).await?);
        }
        Ok(outcomes)
    }
}

/// Append-only record of completed operations
#[async_trait]
pub trait OperationLog: Send + Sync {
    /// Append one record
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be reached.
    async fn append(&self, record: OperationRecord) -> StoreResult<()>;
}

/// Public operation recorded in the operation log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMethod {
    Anonymize,
    Deanonymize,
    AnonymizeJson,
    DeanonymizeJson,
}

impl OperationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Anonymize => "anonymize",
            Self::Deanonymize => "deanonymize",
            Self::AnonymizeJson => "anonymize_json",
            Self::DeanonymizeJson => "deanonymize_json",
        }
    }
}

impl fmt::Display for OperationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form context stored with each operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationMetadata {
    pub purpose: String,
    pub legal_basis: String,
    pub access_reason: Option<String>,
    pub authorized_by: Option<String>,
    /// Values replaced (anonymize) or restored (deanonymize)
    pub entity_count: usize,
    /// Distinct entity types involved, sorted
    pub entity_types: Vec<EntityType>,
    pub mappings_created: usize,
    pub timestamp: DateTime<Utc>,
}

/// One operation log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: Uuid,
    pub identity_id: Option<IdentityId>,
    pub method: OperationMethod,
    pub original_payload: String,
    pub result_payload: String,
    pub metadata: OperationMetadata,
}

impl OperationRecord {
    pub fn new(
        identity_id: Option<IdentityId>,
        method: OperationMethod,
        original_payload: impl Into<String>,
        result_payload: impl Into<String>,
        metadata: OperationMetadata,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity_id,
            method,
            original_payload: original_payload.into(),
            result_payload: result_payload.into(),
            metadata,
        }
    }
}
