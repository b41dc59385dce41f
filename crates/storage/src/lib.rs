//! Storage layer for deposit requests: the `DepositStore` trait, its
//! record types, an in-memory backend, and a backend-agnostic
//! conformance suite.

pub mod conformance;
mod error;
mod memory;
mod record;
mod traits;

pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{FingerprintHit, RequestRecord};
pub use traits::DepositStore;
