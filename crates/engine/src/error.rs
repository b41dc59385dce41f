use remit_core::TransitionError;
use remit_storage::StorageError;

/// All errors the lifecycle engine can return.
///
/// Validation failures, duplicate classifications and extraction
/// failures are not errors; they come back as data in the operation
/// outcomes. Errors are reserved for broken preconditions.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The destination-account directory is misconfigured; receipts
    /// cannot be matched against anything.
    #[error("expected exactly one active destination account, found {active_count}")]
    Configuration { active_count: usize },

    /// Every optimistic-write attempt lost the race.
    #[error("request {request_id} kept conflicting after {attempts} attempts")]
    Conflict { request_id: String, attempts: u32 },

    #[error("request not found: {request_id}")]
    NotFound { request_id: String },

    #[error("request {request_id} has no receipt at index {receipt_index}")]
    ReceiptNotFound {
        request_id: String,
        receipt_index: usize,
    },

    /// The request has no validated figures yet.
    #[error("request {request_id} has not validated")]
    NotValidated { request_id: String },

    /// Manual amount reporting on a request that never switched to
    /// manual capture.
    #[error("request {request_id} is not flagged for manual capture")]
    ManualCaptureRequired { request_id: String },

    /// The receipt is a duplicate or carries extracted evidence; its
    /// amount cannot be reported manually.
    #[error("receipt {receipt_index} of request {request_id} does not accept a reported amount")]
    ReceiptNotCorrectable {
        request_id: String,
        receipt_index: usize,
    },

    #[error("folio already in use: {folio}")]
    FolioInUse { folio: String },

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("storage: {0}")]
    Storage(StorageError),
}

impl From<StorageError> for EngineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::RequestNotFound { request_id } => EngineError::NotFound { request_id },
            StorageError::FolioInUse { folio } => EngineError::FolioInUse { folio },
            other => EngineError::Storage(other),
        }
    }
}
