//! In-process collaborator implementations
//!
//! `MemoryStore` backs the CLI and the test suite. All three traits share one
//! lock per table, which makes insert-if-absent atomic.

use super::traits::{
    IdentityStore, InsertOutcome, MappingStore, OperationLog, OperationRecord, StoreResult,
};
use crate::anonymization::models::{EntityType, IdentityRecord, PseudonymMapping};
use crate::domain::{IdentityId, IdentityKey};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

type NaturalKey = (IdentityId, EntityType, String);

/// In-memory identity, mapping and operation store
#[derive(Debug, Default)]
pub struct MemoryStore {
    identities: Mutex<HashMap<IdentityKey, IdentityRecord>>,
    mappings: Mutex<MappingTable>,
    operations: Mutex<Vec<OperationRecord>>,
}

#[derive(Debug, Default)]
struct MappingTable {
    rows: Vec<PseudonymMapping>,
    index: HashMap<NaturalKey, usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with previously exported mappings
    ///
    /// Mappings whose natural key is already present are skipped.
    pub async fn import_mappings(&self, mappings: Vec<PseudonymMapping>) -> usize {
        let mut table = self.mappings.lock().await;
        let mut imported = 0;
        for mapping in mappings {
            if table.insert(mapping).1 {
                imported += 1;
            }
        }
        imported
    }

    /// Register a previously exported identity
    ///
    /// Returns `false` if the key is already known; the existing record wins.
    pub async fn import_identity(&self, record: IdentityRecord) -> bool {
        let mut identities = self.identities.lock().await;
        if identities.contains_key(&record.key) {
            return false;
        }
        identities.insert(record.key.clone(), record);
        true
    }

    /// Stored record for `key`, if any
    pub async fn identity_record(&self, key: &IdentityKey) -> Option<IdentityRecord> {
        self.identities.lock().await.get(key).cloned()
    }

    /// Number of stored mappings across all identities
    pub async fn mapping_count(&self) -> usize {
        self.mappings.lock().await.rows.len()
    }

    /// Number of known identities
    pub async fn identity_count(&self) -> usize {
        self.identities.lock().await.len()
    }

    /// Snapshot of the operation log
    pub async fn operations(&self) -> Vec<OperationRecord> {
        self.operations.lock().await.clone()
    }
}

impl MappingTable {
    /// Insert unless present; returns the canonical row and whether it is new
    fn insert(&mut self, mapping: PseudonymMapping) -> (PseudonymMapping, bool) {
        let key = mapping.natural_key();
        if let Some(&row) = self.index.get(&key) {
            return (self.rows[row].clone(), false);
        }
        self.index.insert(key, self.rows.len());
        self.rows.push(mapping.clone());
        (mapping, true)
    }
}

#[async_trait]
impl IdentityStore for MemoryStore {
    async fn resolve_or_create(&self, key: &IdentityKey) -> StoreResult<IdentityId> {
        let mut identities = self.identities.lock().await;
        let record = identities.entry(key.clone()).or_insert_with(|| {
            let record = IdentityRecord::new(key.clone());
            tracing::debug!(identity_id = %record.identity_id, "Created identity");
            record
        });
        Ok(record.identity_id)
    }

    async fn resolve_only(&self, key: &IdentityKey) -> StoreResult<Option<IdentityId>> {
        Ok(self
            .identities
            .lock()
            .await
            .get(key)
            .map(|record| record.identity_id))
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn find_all(&self, identity_id: IdentityId) -> StoreResult<Vec<PseudonymMapping>> {
        Ok(self
            .mappings
            .lock()
            .await
            .rows
            .iter()
            .filter(|m| m.identity_id == identity_id)
            .cloned()
            .collect())
    }

    async fn insert_if_absent(&self, mapping: PseudonymMapping) -> StoreResult<InsertOutcome> {
        let (mapping, was_new) = self.mappings.lock().await.insert(mapping);
        Ok(InsertOutcome { mapping, was_new })
    }

    async fn insert_many_if_absent(
        &self,
        mappings: Vec<PseudonymMapping>,
    ) -> StoreResult<Vec<InsertOutcome>> {
        let mut table = self.mappings.lock().await;
        Ok(mappings
            .into_iter()
            .map(|mapping| {
                let (mapping, was_new) = table.insert(mapping);
                InsertOutcome { mapping, was_new }
            })
            .collect())
    }
}

#[async_trait]
impl OperationLog for MemoryStore {
    async fn append(&self, record: OperationRecord) -> StoreResult<()> {
        self.operations.lock().await.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key() -> IdentityKey {
        IdentityKey::new("jane@example.org", "email").unwrap()
    }

    #[tokio::test]
    async fn test_resolve_or_create_is_stable() {
        let store = MemoryStore::new();
        let first = store.resolve_or_create(&key()).await.unwrap();
        let second = store.resolve_or_create(&key()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.identity_count().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_only_does_not_create() {
        let store = MemoryStore::new();
        assert_eq!(store.resolve_only(&key()).await.unwrap(), None);
        assert_eq!(store.identity_count().await, 0);
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_first_row() {
        let store = MemoryStore::new();
        let id = IdentityId::new_v4();
        let first = PseudonymMapping::new(id, EntityType::Name, "John", "faker_name", "Lee");
        let second = PseudonymMapping::new(id, EntityType::Name, "JOHN", "faker_name", "Kim");

        assert!(store.insert_if_absent(first).await.unwrap().was_new);
        let outcome = store.insert_if_absent(second).await.unwrap();
        assert!(!outcome.was_new);
        assert_eq!(outcome.mapping.fake_value, "Lee");
        assert_eq!(store.find_all(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_encounters_share_one_row() {
        let store = Arc::new(MemoryStore::new());
        let id = IdentityId::new_v4();

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    let mapping = PseudonymMapping::new(
                        id,
                        EntityType::Email,
                        "a@b.org",
                        "faker_email",
                        format!("fake{i}@example.com"),
                    );
                    store.insert_if_absent(mapping).await.unwrap().mapping.fake_value
                })
            })
            .collect();

        let mut winners = Vec::new();
        for task in tasks {
            winners.push(task.await.unwrap());
        }
        winners.dedup();
        assert_eq!(winners.len(), 1);
        assert_eq!(store.mapping_count().await, 1);
    }

    #[tokio::test]
    async fn test_import_skips_duplicates() {
        let store = MemoryStore::new();
        let id = IdentityId::new_v4();
        let mapping = PseudonymMapping::new(id, EntityType::Zip, "02101", "hipaa_zip", "021**");
        assert_eq!(
            store
                .import_mappings(vec![mapping.clone(), mapping])
                .await,
            1
        );
    }

    #[tokio::test]
    async fn test_imported_identity_resolves() {
        let store = MemoryStore::new();
        let record = IdentityRecord::new(key());
        let id = record.identity_id;

        assert!(store.import_identity(record.clone()).await);
        assert!(!store.import_identity(IdentityRecord::new(key())).await);
        assert_eq!(store.resolve_only(&key()).await.unwrap(), Some(id));
        assert_eq!(store.identity_record(&key()).await, Some(record));
    }
}
