//! In-memory `DepositStore` backend.
//!
//! A single mutex around the whole population: every trait method is
//! one critical section, which is exactly what gives `update_request`
//! and `commit_attach` their atomicity. Suitable for tests and
//! single-process deployments.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use remit_core::{DuplicateKind, Request};

use crate::error::StorageError;
use crate::record::{FingerprintHit, RequestRecord};
use crate::traits::DepositStore;

#[derive(Debug)]
struct Stored {
    request: Request,
    version: i64,
    /// Insertion order for `list_requests_for_client`.
    seq: u64,
}

#[derive(Default)]
struct Inner {
    requests: BTreeMap<String, Stored>,
    /// Last issued value per named sequence.
    sequences: BTreeMap<String, u64>,
    next_seq: u64,
}

/// Mutex-backed store over `BTreeMap`s.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StorageError> {
        self.inner
            .lock()
            .map_err(|_| StorageError::Backend("poisoned lock".to_string()))
    }
}

/// Scan the client's other fingerprint-blocking requests for a
/// non-duplicate receipt with this fingerprint.
fn find_hit(
    inner: &Inner,
    client_id: &str,
    fingerprint: &str,
    exclude_request: &str,
) -> Option<FingerprintHit> {
    inner
        .requests
        .values()
        .filter(|s| s.request.client_id == client_id)
        .filter(|s| s.request.id != exclude_request)
        .filter(|s| s.request.state.blocks_fingerprint_reuse())
        .find_map(|s| {
            s.request
                .receipts
                .iter()
                .position(|r| r.fingerprint == fingerprint && !r.duplicate.is_duplicate())
                .map(|receipt_index| FingerprintHit {
                    request_id: s.request.id.clone(),
                    receipt_index,
                })
        })
}

fn check_version(stored: &Stored, expected_version: i64) -> Result<(), StorageError> {
    if stored.version != expected_version {
        return Err(StorageError::ConcurrentConflict {
            request_id: stored.request.id.clone(),
            expected_version,
        });
    }
    Ok(())
}

/// Folio uniqueness across the whole population, terminal states
/// included.
fn check_folio_free(inner: &Inner, request: &Request) -> Result<(), StorageError> {
    let folio = match &request.folio {
        Some(f) => f,
        None => return Ok(()),
    };
    let taken = inner
        .requests
        .values()
        .any(|s| s.request.id != request.id && s.request.folio.as_deref() == Some(folio));
    if taken {
        return Err(StorageError::FolioInUse {
            folio: folio.clone(),
        });
    }
    Ok(())
}

#[async_trait]
impl DepositStore for MemoryStore {
    async fn insert_request(&self, request: Request) -> Result<(), StorageError> {
        let mut inner = self.lock()?;
        if inner.requests.contains_key(&request.id) {
            return Err(StorageError::AlreadyExists {
                request_id: request.id,
            });
        }
        check_folio_free(&inner, &request)?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.requests.insert(
            request.id.clone(),
            Stored {
                request,
                version: 0,
                seq,
            },
        );
        Ok(())
    }

    async fn get_request(&self, request_id: &str) -> Result<RequestRecord, StorageError> {
        let inner = self.lock()?;
        let stored = inner
            .requests
            .get(request_id)
            .ok_or_else(|| StorageError::RequestNotFound {
                request_id: request_id.to_string(),
            })?;
        Ok(RequestRecord {
            request: stored.request.clone(),
            version: stored.version,
        })
    }

    async fn update_request(
        &self,
        request: Request,
        expected_version: i64,
    ) -> Result<i64, StorageError> {
        let mut inner = self.lock()?;
        check_folio_free(&inner, &request)?;
        let stored = inner
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| StorageError::RequestNotFound {
                request_id: request.id.clone(),
            })?;
        check_version(stored, expected_version)?;
        stored.request = request;
        stored.version += 1;
        Ok(stored.version)
    }

    async fn commit_attach(
        &self,
        mut request: Request,
        expected_version: i64,
        receipt_index: usize,
    ) -> Result<(DuplicateKind, i64), StorageError> {
        let mut inner = self.lock()?;

        let fingerprint = request
            .receipts
            .get(receipt_index)
            .map(|r| r.fingerprint.clone())
            .ok_or_else(|| {
                StorageError::Backend(format!(
                    "attach commit for {} references missing receipt index {}",
                    request.id, receipt_index
                ))
            })?;

        // Authoritative global check, same critical section as the
        // write: first committed writer wins.
        if !request.receipts[receipt_index].duplicate.is_duplicate() {
            if let Some(hit) = find_hit(&inner, &request.client_id, &fingerprint, &request.id) {
                request.receipts[receipt_index].duplicate = DuplicateKind::Global {
                    origin_request_id: hit.request_id,
                };
            }
        }
        let kind = request.receipts[receipt_index].duplicate.clone();

        let stored = inner
            .requests
            .get_mut(&request.id)
            .ok_or_else(|| StorageError::RequestNotFound {
                request_id: request.id.clone(),
            })?;
        check_version(stored, expected_version)?;
        stored.request = request;
        stored.version += 1;
        Ok((kind, stored.version))
    }

    async fn find_fingerprint(
        &self,
        client_id: &str,
        fingerprint: &str,
        exclude_request: &str,
    ) -> Result<Option<FingerprintHit>, StorageError> {
        let inner = self.lock()?;
        Ok(find_hit(&inner, client_id, fingerprint, exclude_request))
    }

    async fn list_requests_for_client(
        &self,
        client_id: &str,
    ) -> Result<Vec<RequestRecord>, StorageError> {
        let inner = self.lock()?;
        let mut matches: Vec<&Stored> = inner
            .requests
            .values()
            .filter(|s| s.request.client_id == client_id)
            .collect();
        matches.sort_by_key(|s| s.seq);
        Ok(matches
            .into_iter()
            .map(|s| RequestRecord {
                request: s.request.clone(),
                version: s.version,
            })
            .collect())
    }

    async fn next_sequence_value(&self, name: &str) -> Result<u64, StorageError> {
        let mut inner = self.lock()?;
        let floor = inner.sequences.get(name).copied().unwrap_or(0);

        // Union with folios already in the population so the sequence
        // stays monotonic over data imported from elsewhere.
        let prefix = format!("{}-", name);
        let scan_max = inner
            .requests
            .values()
            .filter_map(|s| s.request.folio.as_deref())
            .filter_map(|folio| folio.strip_prefix(&prefix))
            .filter_map(|digits| digits.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let next = floor.max(scan_max) + 1;
        inner.sequences.insert(name.to_string(), next);
        Ok(next)
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use remit_core::{Channel, ChannelMetadata, ExtractedFields, Receipt, ReportedFields};
    use rust_decimal::Decimal;

    fn request(id: &str, client_id: &str) -> Request {
        Request::new(
            id.to_string(),
            Channel::Chat,
            client_id.to_string(),
            "Cliente Uno".to_string(),
            ReportedFields::default(),
            ChannelMetadata::default(),
            "2026-01-01T00:00:00Z".to_string(),
        )
    }

    fn receipt(fingerprint: &str) -> Receipt {
        Receipt {
            fingerprint: fingerprint.to_string(),
            display_name: "r.pdf".to_string(),
            extracted: Some(ExtractedFields {
                amount: Some(Decimal::new(150_000_00, 2)),
                ..ExtractedFields::default()
            }),
            valid: true,
            reason: "ok".to_string(),
            duplicate: DuplicateKind::None,
            discard_reason: None,
        }
    }

    #[tokio::test]
    async fn stale_version_write_is_a_concurrent_conflict() {
        let store = MemoryStore::new();
        store.insert_request(request("req-1", "c1")).await.unwrap();

        let rec = store.get_request("req-1").await.unwrap();
        let v1 = store
            .update_request(rec.request.clone(), rec.version)
            .await
            .unwrap();
        assert_eq!(v1, 1);

        // Second write with the stale version must fail.
        let err = store
            .update_request(rec.request, rec.version)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::ConcurrentConflict { .. }));
    }

    #[tokio::test]
    async fn folio_held_by_another_request_is_rejected() {
        let store = MemoryStore::new();
        let mut a = request("req-a", "c1");
        a.folio = Some("NC-000001".to_string());
        store.insert_request(a).await.unwrap();
        store.insert_request(request("req-b", "c1")).await.unwrap();

        let rec = store.get_request("req-b").await.unwrap();
        let mut b = rec.request;
        b.folio = Some("NC-000001".to_string());
        let err = store.update_request(b, rec.version).await.unwrap_err();
        assert!(matches!(err, StorageError::FolioInUse { .. }));
    }

    #[tokio::test]
    async fn commit_attach_downgrades_to_global_when_another_request_holds_it() {
        let store = MemoryStore::new();
        let mut origin = request("req-a", "c1");
        origin.receipts.push(receipt("sha256:dead"));
        store.insert_request(origin).await.unwrap();

        let mut other = request("req-b", "c1");
        other.receipts.push(receipt("sha256:dead"));
        store.insert_request(other.clone()).await.unwrap();

        let (kind, version) = store.commit_attach(other, 0, 0).await.unwrap();
        assert_eq!(
            kind,
            DuplicateKind::Global {
                origin_request_id: "req-a".to_string()
            }
        );
        assert_eq!(version, 1);
        // The override is persisted, not just reported.
        let rec = store.get_request("req-b").await.unwrap();
        assert!(rec.request.receipts[0].duplicate.is_duplicate());
    }

    #[tokio::test]
    async fn fingerprints_on_other_clients_are_invisible() {
        let store = MemoryStore::new();
        let mut origin = request("req-a", "c1");
        origin.receipts.push(receipt("sha256:dead"));
        store.insert_request(origin).await.unwrap();

        let hit = store
            .find_fingerprint("c2", "sha256:dead", "req-x")
            .await
            .unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn sequence_is_seeded_from_existing_folios() {
        let store = MemoryStore::new();
        let mut imported = request("req-a", "c1");
        imported.folio = Some("NC-000041".to_string());
        store.insert_request(imported).await.unwrap();

        assert_eq!(store.next_sequence_value("NC").await.unwrap(), 42);
        assert_eq!(store.next_sequence_value("NC").await.unwrap(), 43);
        // A different prefix is its own sequence.
        assert_eq!(store.next_sequence_value("RM").await.unwrap(), 1);
    }
}
