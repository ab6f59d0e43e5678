//! Data models for detection and pseudonymization

pub mod entity;
pub mod mapping;
pub mod request;

pub use entity::{DetectionMethod, Entity, EntityType};
pub use mapping::{IdentityRecord, PseudonymMapping};
pub use request::RequestContext;
