//! Deposit-request lifecycle engine.
//!
//! Ties the domain core to a [`remit_storage::DepositStore`] backend
//! and to the external collaborators (text extraction, client
//! directory, active-account directory, notifications). All writes go
//! through optimistic concurrency with bounded retries; duplicate and
//! validation outcomes are returned as data, never as errors.

pub mod collaborators;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod lifecycle;
pub mod sequence;

pub use collaborators::{
    AccountConfigError, ActiveAccountDirectory, ClientDirectory, ExtractionFailure,
    LifecycleEvent, NotificationSink, NotifyError, TextExtractor,
};
pub use config::EngineConfig;
pub use error::EngineError;
pub use fingerprint::fingerprint;
pub use lifecycle::{AttachOutcome, Engine, NewRequest, ValidateOutcome};
pub use sequence::next_identifier;
