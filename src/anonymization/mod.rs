//! PHI detection and reversible, identity-scoped pseudonymization
//!
//! # Architecture
//!
//! The pipeline for one operation is:
//! - **Detection**: pattern-library matching plus optional NER enrichment,
//!   collapsed into non-overlapping spans by the overlap resolver
//! - **Pseudonymization**: each value resolves to a stored mapping, an
//!   in-flight proposal, or a newly generated fake value
//! - **Compliance**: HIPAA Safe Harbor generalization for dates, ZIP codes
//!   and ages, and processing-purpose checks
//! - **Substitution**: text splicing or a shape-preserving JSON fold
//! - **Persistence and audit**: insert-if-absent mapping storage, an
//!   operation log, and an audit trail with hashed identity values
//!
//! [`Pseudonymizer`] is the stateless core; [`PseudonymizationService`]
//! drives it against the store and audit collaborators.
//!
//! # Usage
//!
//! ```no_run
//! use harbor::anonymization::{
//!     AnonymizationConfig, MemoryStore, PseudonymizationService, RequestContext,
//! };
//! use harbor::domain::IdentityKey;
//! use std::sync::Arc;
//!
//! # async fn example() -> harbor::domain::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let service = PseudonymizationService::from_config(&AnonymizationConfig::default(), store)?;
//!
//! let identity = IdentityKey::new("jane@example.org", "email")
//!     .map_err(harbor::domain::HarborError::InvalidInput)?;
//! let context = RequestContext::new().with_purpose("healthcare_provision");
//! let out = service
//!     .anonymize_text(&identity, "Patient: John Smith, DOB: 03/15/1975", &context)
//!     .await?;
//! println!("{}", out.value);
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod compliance;
pub mod config;
pub mod detector;
pub mod engine;
pub mod json;
pub mod models;
pub mod pseudonym;
pub mod report;
pub mod service;
pub mod store;
pub mod substitution;

// Re-export main types
pub use audit::{AuditLogger, AuditRecord, FileAuditLogger};
pub use compliance::{ConsentPolicy, SafeHarborRules};
pub use config::AnonymizationConfig;
pub use detector::{PhiDetector, RegexDetector};
pub use engine::{Pseudonymizer, Restoration, TextAnonymization};
pub use models::{Entity, EntityType, IdentityRecord, PseudonymMapping, RequestContext};
pub use report::DetectionReport;
pub use service::{Anonymized, PseudonymizationService};
pub use store::{IdentityStore, MappingStore, MemoryStore, OperationLog};
pub use substitution::Decision;
