use remit_core::Request;
use serde::{Deserialize, Serialize};

/// A stored request together with its OCC version.
///
/// The version counts committed writes; every successful update
/// increments it by one. Readers carry it back as `expected_version`
/// on the next write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request: Request,
    pub version: i64,
}

/// Where a fingerprint was found during a global-duplicate lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintHit {
    /// Request holding the receipt with this fingerprint.
    pub request_id: String,
    /// Index of the receipt within that request.
    pub receipt_index: usize,
}
