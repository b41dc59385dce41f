/// All errors that can be returned by a `DepositStore` implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Optimistic concurrency control conflict -- another writer
    /// committed the request since this snapshot was read.
    #[error("concurrent conflict on request {request_id}: expected version {expected_version}")]
    ConcurrentConflict {
        request_id: String,
        expected_version: i64,
    },

    /// No request with the given id.
    #[error("request not found: {request_id}")]
    RequestNotFound { request_id: String },

    /// A request with this id already exists.
    #[error("request already exists: {request_id}")]
    AlreadyExists { request_id: String },

    /// The folio is held by another request. Folios are unique
    /// process-wide and never reassigned.
    #[error("folio already in use: {folio}")]
    FolioInUse { folio: String },

    /// A backend-specific storage error (connection, serialization,
    /// poisoned lock).
    #[error("storage backend error: {0}")]
    Backend(String),
}
