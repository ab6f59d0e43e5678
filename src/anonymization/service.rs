//! Pseudonymization service
//!
//! [`PseudonymizationService`] is the public entry point used by the CLI and
//! by embedding applications. Each operation runs one pass:
//!
//! 1. audit the access and check the processing purpose
//! 2. resolve the identity and load its stored mappings
//! 3. run the stateless core
//! 4. persist proposals with insert-if-absent; if another writer won with a
//!    different fake value, rerun the core against the canonical rows
//! 5. append to the operation log and audit the outcome
//!
//! Every failure is reported through `log_error` before it propagates.

use crate::anonymization::audit::{create_audit_logger, AuditLogger, AuditRecord};
use crate::anonymization::compliance::ConsentPolicy;
use crate::anonymization::config::AnonymizationConfig;
use crate::anonymization::engine::{Pseudonymizer, Restoration};
use crate::anonymization::models::{Entity, EntityType, PseudonymMapping, RequestContext};
use crate::anonymization::store::{
    IdentityStore, InsertOutcome, MappingStore, OperationLog, OperationMetadata,
    OperationMethod, OperationRecord,
};
use crate::domain::{HarborError, IdentityId, IdentityKey, Result};
use crate::{log_error_with_context, log_operation_complete, log_operation_start};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Output of an anonymize call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anonymized<T> {
    pub value: T,
    /// `None` when nothing was detected and no identity was touched
    pub identity_id: Option<IdentityId>,
    /// Number of values replaced
    pub entity_count: usize,
    /// Distinct types of the replaced values, sorted
    pub entity_types: Vec<EntityType>,
    /// Mappings persisted by this call
    pub mappings_created: usize,
}

impl<T> Anonymized<T> {
    fn untouched(value: T) -> Self {
        Self {
            value,
            identity_id: None,
            entity_count: 0,
            entity_types: Vec::new(),
            mappings_created: 0,
        }
    }

    fn map<U>(self, f: impl FnOnce(T) -> U) -> Anonymized<U> {
        Anonymized {
            value: f(self.value),
            identity_id: self.identity_id,
            entity_count: self.entity_count,
            entity_types: self.entity_types,
            mappings_created: self.mappings_created,
        }
    }
}

/// Adds outcome fields to a success audit record
trait Audited {
    fn annotate(&self, record: AuditRecord) -> AuditRecord;
}

impl<T> Audited for Anonymized<T> {
    fn annotate(&self, record: AuditRecord) -> AuditRecord {
        record
            .with_opt("identity_id", self.identity_id.map(|id| id.to_string()))
            .with("entity_count", self.entity_count)
            .with("entity_types", type_labels(&self.entity_types))
            .with("mappings_created", self.mappings_created)
    }
}

impl<T> Audited for Restoration<T> {
    fn annotate(&self, record: AuditRecord) -> AuditRecord {
        record.with("restored_count", self.restored_count)
    }
}

impl Audited for Vec<Entity> {
    fn annotate(&self, record: AuditRecord) -> AuditRecord {
        let types: BTreeSet<EntityType> = self.iter().map(|e| e.entity_type).collect();
        let types: Vec<EntityType> = types.into_iter().collect();
        record
            .with("entity_count", self.len())
            .with("entity_types", type_labels(&types))
    }
}

/// Orchestrates the core, the store collaborators and the audit sink
pub struct PseudonymizationService {
    core: Arc<Pseudonymizer>,
    identities: Arc<dyn IdentityStore>,
    mappings: Arc<dyn MappingStore>,
    operations: Arc<dyn OperationLog>,
    audit: Arc<dyn AuditLogger>,
    consent: ConsentPolicy,
}

impl PseudonymizationService {
    /// Create a service over separate collaborators
    ///
    /// Consent is not enforced until [`with_consent`](Self::with_consent) is
    /// called.
    pub fn new(
        core: Arc<Pseudonymizer>,
        identities: Arc<dyn IdentityStore>,
        mappings: Arc<dyn MappingStore>,
        operations: Arc<dyn OperationLog>,
        audit: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            core,
            identities,
            mappings,
            operations,
            audit,
            consent: ConsentPolicy::permissive(),
        }
    }

    /// Create a service over one backend implementing every store trait
    pub fn with_store<S>(core: Arc<Pseudonymizer>, store: Arc<S>, audit: Arc<dyn AuditLogger>) -> Self
    where
        S: IdentityStore + MappingStore + OperationLog + 'static,
    {
        Self::new(core, store.clone(), store.clone(), store, audit)
    }

    /// Build the core, consent policy and audit sink from `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the pattern library
    /// cannot be loaded or the audit log cannot be opened.
    pub fn from_config<S>(config: &AnonymizationConfig, store: Arc<S>) -> Result<Self>
    where
        S: IdentityStore + MappingStore + OperationLog + 'static,
    {
        let core = Arc::new(Pseudonymizer::from_config(config)?);
        let audit = create_audit_logger(&config.audit)?;
        Ok(Self::with_store(core, store, audit).with_consent(ConsentPolicy::new(&config.consent)))
    }

    /// Replace the consent policy
    pub fn with_consent(mut self, consent: ConsentPolicy) -> Self {
        self.consent = consent;
        self
    }

    pub fn core(&self) -> &Pseudonymizer {
        &self.core
    }

    /// Detect identifiers without touching any identity
    pub async fn detect(&self, text: &str, context: &RequestContext) -> Result<Vec<Entity>> {
        let record = AuditRecord::new("detect").with("purpose", context.purpose_label());
        self.guarded(record, context, async { Ok(self.core.detect(text)) })
            .await
    }

    /// Anonymize free text for `identity`
    ///
    /// Text without detections is returned unchanged and creates no identity.
    pub async fn anonymize_text(
        &self,
        identity: &IdentityKey,
        text: &str,
        context: &RequestContext,
    ) -> Result<Anonymized<String>> {
        let method = OperationMethod::Anonymize;
        self.guarded(
            self.audit_record(method, identity, context),
            context,
            self.run_anonymize_text(identity, text, context),
        )
        .await
    }

    /// Restore original values in text anonymized for `identity`
    ///
    /// An unknown identity restores nothing and is not an error.
    pub async fn deanonymize_text(
        &self,
        identity: &IdentityKey,
        text: &str,
        context: &RequestContext,
    ) -> Result<Restoration<String>> {
        let method = OperationMethod::Deanonymize;
        self.guarded(
            self.audit_record(method, identity, context),
            context,
            self.run_deanonymize_text(identity, text, context),
        )
        .await
    }

    /// Anonymize a JSON document for `identity`, keeping its shape
    pub async fn anonymize_json(
        &self,
        identity: &IdentityKey,
        document: &Value,
        context: &RequestContext,
    ) -> Result<Anonymized<Value>> {
        let method = OperationMethod::AnonymizeJson;
        self.guarded(
            self.audit_record(method, identity, context),
            context,
            self.run_anonymize_json(identity, document, context),
        )
        .await
    }

    /// Same as [`anonymize_json`](Self::anonymize_json) over serialized JSON
    ///
    /// # Errors
    ///
    /// Malformed input fails with [`HarborError::InvalidInput`]; nothing is
    /// persisted in that case.
    pub async fn anonymize_json_str(
        &self,
        identity: &IdentityKey,
        input: &str,
        context: &RequestContext,
    ) -> Result<Anonymized<String>> {
        let method = OperationMethod::AnonymizeJson;
        self.guarded(self.audit_record(method, identity, context), context, async {
            let document = parse_json(input)?;
            let anonymized = self.run_anonymize_json(identity, &document, context).await?;
            let rendered = serde_json::to_string(&anonymized.value)?;
            Ok::<_, HarborError>(anonymized.map(|_| rendered))
        })
        .await
    }

    /// Restore original values in a JSON document anonymized for `identity`
    pub async fn deanonymize_json(
        &self,
        identity: &IdentityKey,
        document: &Value,
        context: &RequestContext,
    ) -> Result<Restoration<Value>> {
        let method = OperationMethod::DeanonymizeJson;
        self.guarded(
            self.audit_record(method, identity, context),
            context,
            self.run_deanonymize_json(identity, document, context),
        )
        .await
    }

    /// Same as [`deanonymize_json`](Self::deanonymize_json) over serialized JSON
    pub async fn deanonymize_json_str(
        &self,
        identity: &IdentityKey,
        input: &str,
        context: &RequestContext,
    ) -> Result<Restoration<String>> {
        let method = OperationMethod::DeanonymizeJson;
        self.guarded(self.audit_record(method, identity, context), context, async {
            let document = parse_json(input)?;
            let restored = self.run_deanonymize_json(identity, &document, context).await?;
            Ok::<_, HarborError>(Restoration {
                value: serde_json::to_string(&restored.value)?,
                restored_count: restored.restored_count,
            })
        })
        .await
    }

    async fn run_anonymize_text(
        &self,
        identity: &IdentityKey,
        text: &str,
        context: &RequestContext,
    ) -> Result<Anonymized<String>> {
        let method = OperationMethod::Anonymize;
        log_operation_start!(method, identity.identity_type());
        let started = Instant::now();

        let entities = self.core.detect(text);
        if entities.is_empty() {
            self.append_operation(None, method, text, text, context, 0, Vec::new(), 0)
                .await?;
            log_operation_complete!(method, 0usize, started.elapsed());
            return Ok(Anonymized::untouched(text.to_string()));
        }

        let identity_id = self.identities.resolve_or_create(identity).await?;
        let stored = self.mappings.find_all(identity_id).await?;

        let mut result = self
            .core
            .anonymize_entities(identity_id, text, entities.clone(), &stored);
        let mut mappings_created = 0;
        if !result.proposed.is_empty() {
            let outcomes = self
                .mappings
                .insert_many_if_absent(result.proposed.clone())
                .await?;
            mappings_created = count_new(&outcomes);
            if diverged(&result.proposed, &outcomes) {
                tracing::debug!(%identity_id, "Concurrent writer won, re-applying canonical mappings");
                let canonical = canonical_rows(stored, outcomes);
                result = self
                    .core
                    .anonymize_entities(identity_id, text, entities, &canonical);
            }
        }

        let anonymized = Anonymized {
            identity_id: Some(identity_id),
            entity_count: result.substituted_count(),
            entity_types: result.substituted_types(),
            mappings_created,
            value: result.text,
        };
        self.append_operation(
            Some(identity_id),
            method,
            text,
            &anonymized.value,
            context,
            anonymized.entity_count,
            anonymized.entity_types.clone(),
            mappings_created,
        )
        .await?;

        log_operation_complete!(method, anonymized.entity_count, started.elapsed());
        Ok(anonymized)
    }

    async fn run_deanonymize_text(
        &self,
        identity: &IdentityKey,
        text: &str,
        context: &RequestContext,
    ) -> Result<Restoration<String>> {
        let method = OperationMethod::Deanonymize;
        log_operation_start!(method, identity.identity_type());
        let started = Instant::now();

        let Some(identity_id) = self.identities.resolve_only(identity).await? else {
            tracing::debug!("Unknown identity, nothing to restore");
            self.append_operation(None, method, text, text, context, 0, Vec::new(), 0)
                .await?;
            return Ok(Restoration::unchanged(text.to_string()));
        };

        let mappings = self.mappings.find_all(identity_id).await?;
        let restored = self.core.deanonymize_text(text, &mappings);
        self.append_operation(
            Some(identity_id),
            method,
            text,
            &restored.value,
            context,
            restored.restored_count,
            types_present(&mappings, |fake| text.contains(fake)),
            0,
        )
        .await?;

        log_operation_complete!(method, restored.restored_count, started.elapsed());
        Ok(restored)
    }

    async fn run_anonymize_json(
        &self,
        identity: &IdentityKey,
        document: &Value,
        context: &RequestContext,
    ) -> Result<Anonymized<Value>> {
        let method = OperationMethod::AnonymizeJson;
        log_operation_start!(method, identity.identity_type());
        let started = Instant::now();

        let identity_id = self.identities.resolve_or_create(identity).await?;
        let stored = self.mappings.find_all(identity_id).await?;

        let mut folded = self.core.anonymize_json(identity_id, document, &stored);
        let mut mappings_created = 0;
        if !folded.proposed.is_empty() {
            let outcomes = self
                .mappings
                .insert_many_if_absent(folded.proposed.clone())
                .await?;
            mappings_created = count_new(&outcomes);
            if diverged(&folded.proposed, &outcomes) {
                tracing::debug!(%identity_id, "Concurrent writer won, re-applying canonical mappings");
                let canonical = canonical_rows(stored, outcomes);
                folded = self.core.anonymize_json(identity_id, document, &canonical);
            }
        }

        let entity_types: Vec<EntityType> = folded
            .redacted
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let anonymized = Anonymized {
            identity_id: Some(identity_id),
            entity_count: folded.redacted.len(),
            entity_types,
            mappings_created,
            value: folded.value,
        };

        self.append_operation(
            Some(identity_id),
            method,
            &serde_json::to_string(document)?,
            &serde_json::to_string(&anonymized.value)?,
            context,
            anonymized.entity_count,
            anonymized.entity_types.clone(),
            mappings_created,
        )
        .await?;

        log_operation_complete!(method, anonymized.entity_count, started.elapsed());
        Ok(anonymized)
    }

    async fn run_deanonymize_json(
        &self,
        identity: &IdentityKey,
        document: &Value,
        context: &RequestContext,
    ) -> Result<Restoration<Value>> {
        let method = OperationMethod::DeanonymizeJson;
        log_operation_start!(method, identity.identity_type());
        let started = Instant::now();
        let original = serde_json::to_string(document)?;

        let Some(identity_id) = self.identities.resolve_only(identity).await? else {
            tracing::debug!("Unknown identity, nothing to restore");
            self.append_operation(None, method, &original, &original, context, 0, Vec::new(), 0)
                .await?;
            return Ok(Restoration::unchanged(document.clone()));
        };

        let mappings = self.mappings.find_all(identity_id).await?;
        let restored = self.core.deanonymize_json(document, &mappings);
        self.append_operation(
            Some(identity_id),
            method,
            &original,
            &serde_json::to_string(&restored.value)?,
            context,
            restored.restored_count,
            types_present(&mappings, |fake| original.contains(fake)),
            0,
        )
        .await?;

        log_operation_complete!(method, restored.restored_count, started.elapsed());
        Ok(restored)
    }

    /// Audit access, check consent, run `work`, audit the outcome
    async fn guarded<T, F>(&self, record: AuditRecord, context: &RequestContext, work: F) -> Result<T>
    where
        T: Audited,
        F: Future<Output = Result<T>>,
    {
        let outcome: Result<T> = async {
            self.audit.log_access(&record).await?;
            self.consent.check(context)?;
            let value = work.await?;
            self.audit
                .log_success(&value.annotate(record.clone()))
                .await?;
            Ok::<T, HarborError>(value)
        }
        .await;

        if let Err(ref error) = outcome {
            self.report_failure(&record, error).await;
        }
        outcome
    }

    async fn report_failure(&self, record: &AuditRecord, error: &HarborError) {
        log_error_with_context!(error, "Pseudonymization operation failed");
        let failure = record
            .clone()
            .with("error_kind", error.kind())
            .with("error", error.to_string());
        if let Err(audit_error) = self.audit.log_error(&failure).await {
            tracing::warn!(error = %audit_error, "Failed to write audit error record");
        }
    }

    fn audit_record(
        &self,
        method: OperationMethod,
        identity: &IdentityKey,
        context: &RequestContext,
    ) -> AuditRecord {
        AuditRecord::new(method.as_str())
            .with("identity", identity.identity())
            .with("identity_type", identity.identity_type())
            .with("purpose", context.purpose_label())
            .with_opt("access_reason", context.access_reason.clone())
            .with_opt("authorized_by", context.authorized_by.clone())
    }

    #[allow(clippy::too_many_arguments)]
    async fn append_operation(
        &self,
        identity_id: Option<IdentityId>,
        method: OperationMethod,
        original: &str,
        result: &str,
        context: &RequestContext,
        entity_count: usize,
        entity_types: Vec<EntityType>,
        mappings_created: usize,
    ) -> Result<()> {
        let metadata = OperationMetadata {
            purpose: context.purpose_label().to_string(),
            legal_basis: self.consent.legal_basis().to_string(),
            access_reason: context.access_reason.clone(),
            authorized_by: context.authorized_by.clone(),
            entity_count,
            entity_types,
            mappings_created,
            timestamp: Utc::now(),
        };
        self.operations
            .append(OperationRecord::new(
                identity_id,
                method,
                original,
                result,
                metadata,
            ))
            .await?;
        Ok(())
    }
}

fn parse_json(input: &str) -> Result<Value> {
    serde_json::from_str(input).map_err(|e| HarborError::InvalidInput(format!("malformed JSON: {e}")))
}

fn count_new(outcomes: &[InsertOutcome]) -> usize {
    outcomes.iter().filter(|o| o.was_new).count()
}

/// True when a stored row disagrees with the fake value this call used
fn diverged(proposed: &[PseudonymMapping], outcomes: &[InsertOutcome]) -> bool {
    proposed
        .iter()
        .zip(outcomes)
        .any(|(p, o)| !o.was_new && o.mapping.fake_value != p.fake_value)
}

fn canonical_rows(stored: Vec<PseudonymMapping>, outcomes: Vec<InsertOutcome>) -> Vec<PseudonymMapping> {
    stored
        .into_iter()
        .chain(outcomes.into_iter().map(|o| o.mapping))
        .collect()
}

/// Sorted distinct types of the mappings whose fake value `present` accepts
fn types_present(mappings: &[PseudonymMapping], present: impl Fn(&str) -> bool) -> Vec<EntityType> {
    mappings
        .iter()
        .filter(|m| !m.fake_value.is_empty() && present(&m.fake_value))
        .map(|m| m.entity_type)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn type_labels(types: &[EntityType]) -> Vec<String> {
    types.iter().map(|t| t.label().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anonymization::audit::NoopAuditLogger;
    use crate::anonymization::store::MemoryStore;

    fn service() -> (PseudonymizationService, Arc<MemoryStore>) {
        let core = Arc::new(Pseudonymizer::from_config(&AnonymizationConfig::default()).unwrap());
        let store = Arc::new(MemoryStore::new());
        let service =
            PseudonymizationService::with_store(core, store.clone(), Arc::new(NoopAuditLogger));
        (service, store)
    }

    fn key() -> IdentityKey {
        IdentityKey::new("john.smith@example.org", "email").unwrap()
    }

    #[tokio::test]
    async fn test_text_without_detections_creates_no_identity() {
        let (service, store) = service();
        let out = service
            .anonymize_text(&key(), "Vitals stable.", &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(out.value, "Vitals stable.");
        assert_eq!(out.identity_id, None);
        assert_eq!(store.identity_count().await, 0);
        assert_eq!(store.operations().await.len(), 1);
    }

    #[tokio::test]
    async fn test_stored_row_is_honoured() {
        let (service, store) = service();
        let identity_id = store.resolve_or_create(&key()).await.unwrap();
        store
            .import_mappings(vec![PseudonymMapping::new(
                identity_id,
                EntityType::Ssn,
                "123-45-6789",
                "pool_ssn",
                "999-99-0000",
            )])
            .await;

        let out = service
            .anonymize_text(&key(), "SSN 123-45-6789", &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(out.value, "SSN 999-99-0000");
        assert_eq!(out.mappings_created, 0);
    }

    #[test]
    fn test_diverged_only_on_different_fake() {
        let id = IdentityId::new_v4();
        let proposal = PseudonymMapping::new(id, EntityType::Mrn, "A-1", "pool_mrn", "MRN-1");
        let same = InsertOutcome {
            mapping: proposal.clone(),
            was_new: false,
        };
        let other = InsertOutcome {
            mapping: PseudonymMapping::new(id, EntityType::Mrn, "A-1", "pool_mrn", "MRN-2"),
            was_new: false,
        };
        assert!(!diverged(std::slice::from_ref(&proposal), &[same]));
        assert!(diverged(&[proposal], &[other]));
    }

    #[tokio::test]
    async fn test_operation_metadata() {
        let (service, store) = service();
        let context = RequestContext::new()
            .with_purpose("healthcare_provision")
            .with_authorized_by("clinician-7");
        service
            .anonymize_text(&key(), "Patient: John Smith, SSN 123-45-6789", &context)
            .await
            .unwrap();

        let operations = store.operations().await;
        let metadata = &operations[0].metadata;
        assert_eq!(operations[0].method, OperationMethod::Anonymize);
        assert_eq!(metadata.purpose, "healthcare_provision");
        assert_eq!(metadata.legal_basis, "Article 9(2)(h)");
        assert_eq!(metadata.authorized_by.as_deref(), Some("clinician-7"));
        assert_eq!(metadata.entity_count, 2);
        assert_eq!(metadata.entity_types, vec![EntityType::Name, EntityType::Ssn]);
        assert_eq!(metadata.mappings_created, 2);
    }
}
