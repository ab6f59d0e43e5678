//! Mappings bundle exchanged between `anonymize` and `deanonymize`
//!
//! The CLI runs against an in-memory store, so the identity record and its
//! mappings are written to a JSON file that a later run imports.

use crate::anonymization::models::{IdentityRecord, PseudonymMapping};
use crate::anonymization::store::MemoryStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One identity and every mapping stored for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingBundle {
    pub identity: IdentityRecord,
    pub mappings: Vec<PseudonymMapping>,
}

impl MappingBundle {
    /// Read a bundle file
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read mappings bundle {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Invalid mappings bundle {}", path.display()))
    }

    /// Write the bundle as pretty JSON
    pub fn write(&self, path: &Path) -> anyhow::Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write mappings bundle {}", path.display()))
    }

    /// Seed `store` with this bundle
    pub async fn import_into(self, store: &MemoryStore) -> usize {
        if !store.import_identity(self.identity).await {
            tracing::warn!("Identity already present, keeping the stored record");
        }
        store.import_mappings(self.mappings).await
    }
}
