//! Identity, mapping and operation-log collaborators

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{
    IdentityStore, InsertOutcome, MappingStore, OperationLog, OperationMetadata, OperationMethod,
    OperationRecord, StoreResult,
};
