//! Domain types shared across Harbor.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Identity identifiers** ([`IdentityId`], [`IdentityKey`])
//! - **Error types** ([`HarborError`], [`StoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible library operations return [`Result<T, HarborError>`]:
//!
//! ```rust
//! use harbor::domain::{HarborError, Result};
//!
//! fn parse(input: &str) -> Result<serde_json::Value> {
//!     serde_json::from_str(input).map_err(|e| HarborError::InvalidInput(e.to_string()))
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod result;

pub use errors::{HarborError, StoreError};
pub use ids::{IdentityId, IdentityKey};
pub use result::Result;
