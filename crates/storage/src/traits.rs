use async_trait::async_trait;

use remit_core::{DuplicateKind, Request};

use crate::error::StorageError;
use crate::record::{FingerprintHit, RequestRecord};

/// Durable storage for deposit requests.
///
/// ## OCC semantics
///
/// Reads return a [`RequestRecord`] carrying the committed version.
/// Every write takes the `expected_version` the caller read; if the
/// stored version differs, the write fails with
/// `StorageError::ConcurrentConflict` and nothing changes. The engine
/// retries a bounded number of times on a fresh read.
///
/// ## Commit-time invariants
///
/// Two invariants cannot be enforced by a read-then-write engine loop
/// without a race, so the store enforces them inside the write:
///
/// - **Folio uniqueness**: `update_request` rejects a write whose
///   folio is held by a different request (`FolioInUse`), including
///   folios on requests in terminal states.
/// - **Global duplicate classification**: `commit_attach` re-checks
///   the attached receipt's fingerprint against the client's other
///   fingerprint-blocking requests under the same critical section
///   that commits the write, and overrides the receipt's
///   classification to `Global` when an earlier writer won.
///
/// ## Thread safety
///
/// Implementations must be `Send + Sync + 'static` so the engine can
/// be shared across async task boundaries.
#[async_trait]
pub trait DepositStore: Send + Sync + 'static {
    /// Insert a new request at version 0.
    ///
    /// Returns `Err(StorageError::AlreadyExists)` when the id is taken.
    async fn insert_request(&self, request: Request) -> Result<(), StorageError>;

    /// Read a request and its committed version.
    async fn get_request(&self, request_id: &str) -> Result<RequestRecord, StorageError>;

    /// Version-validated full-record write (OCC). Enforces folio
    /// uniqueness at commit. Returns the new version.
    async fn update_request(
        &self,
        request: Request,
        expected_version: i64,
    ) -> Result<i64, StorageError>;

    /// Commit a request whose receipt at `receipt_index` was just
    /// attached. Atomically with the OCC check, re-runs the global
    /// fingerprint lookup and downgrades the receipt to
    /// `DuplicateKind::Global` if another request of the same client
    /// now holds the fingerprint. Returns the final classification and
    /// the new version.
    async fn commit_attach(
        &self,
        request: Request,
        expected_version: i64,
        receipt_index: usize,
    ) -> Result<(DuplicateKind, i64), StorageError>;

    /// Find a fingerprint among the client's other requests whose
    /// state blocks reuse. Advisory only; `commit_attach` is the
    /// authoritative check.
    async fn find_fingerprint(
        &self,
        client_id: &str,
        fingerprint: &str,
        exclude_request: &str,
    ) -> Result<Option<FingerprintHit>, StorageError>;

    /// All requests of a client, in insertion order.
    async fn list_requests_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<RequestRecord>, StorageError>;

    /// Next value of a named monotonic sequence, as a single atomic
    /// step. The sequence floor is seeded from folios already present
    /// in the population (any state, terminal included), so values
    /// never repeat even across restarts or deletions.
    async fn next_sequence_value(&self, name: &str) -> Result<u64, StorageError>;
}
