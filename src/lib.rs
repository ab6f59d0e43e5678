// Harbor - PHI Detection and Reversible Pseudonymization Engine
// Copyright (c) 2025 Harbor Contributors
// Licensed under the MIT License

//! # Harbor - PHI Detection and Reversible Pseudonymization
//!
//! Harbor finds personal and protected health information in free text and
//! JSON documents and replaces it with stable synthetic values that can be
//! reversed later for the same identity.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Detecting** identifiers with a declarative pattern library and
//!   optional NER enrichment
//! - **Pseudonymizing** them with deterministic fake values, scoped to one
//!   external identity
//! - **Generalizing** dates, ZIP codes and ages per HIPAA Safe Harbor
//! - **Restoring** original values from stored mappings
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`anonymization`] - Detection, pseudonymization, compliance, stores and audit
//! - [`domain`] - Identity types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use harbor::anonymization::{MemoryStore, PseudonymizationService, RequestContext};
//! use harbor::config::load_config;
//! use harbor::domain::IdentityKey;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("harbor.toml")?;
//!     let service = PseudonymizationService::from_config(
//!         &config.anonymization,
//!         Arc::new(MemoryStore::new()),
//!     )?;
//!
//!     let identity = IdentityKey::new("MRN-0042", "mrn")?;
//!     let context = RequestContext::new().with_purpose("healthcare_provision");
//!
//!     let text = "Patient: John Smith, DOB: 03/15/1975, MRN: ABC-123456";
//!     let anonymized = service.anonymize_text(&identity, text, &context).await?;
//!     let restored = service
//!         .deanonymize_text(&identity, &anonymized.value, &context)
//!         .await?;
//!
//!     assert_eq!(restored.value, text);
//!     Ok(())
//! }
//! ```
//!
//! ## JSON Documents
//!
//! JSON is walked with its shape preserved: key order, array lengths and node
//! kinds never change. Keys such as `ssn` or `patientName` redact their whole
//! value, provider keys are left alone, and other strings are scanned.
//!
//! ```rust
//! use harbor::anonymization::{AnonymizationConfig, Pseudonymizer};
//! use harbor::domain::IdentityId;
//! use serde_json::json;
//!
//! # fn example() -> harbor::domain::Result<()> {
//! let core = Pseudonymizer::from_config(&AnonymizationConfig::default())?;
//! let document = json!({"ssn": "123-45-6789", "attending_physician": "Dr. Jane Doe"});
//! let folded = core.anonymize_json(IdentityId::new_v4(), &document, &[]);
//! assert_eq!(folded.value["attending_physician"], "Dr. Jane Doe");
//! # Ok(())
//! # }
//! ```

pub mod anonymization;
pub mod cli;
pub mod config;
pub mod domain;
pub mod logging;
