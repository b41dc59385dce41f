use std::future::Future;
use std::sync::Arc;

use super::{fixture_request, TestResult};
use crate::{DepositStore, StorageError};

/// Number of concurrent tasks racing in the spawn-based test.
const N: usize = 10;

pub(super) async fn run<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "occ",
            "stale_version_is_rejected",
            stale_version_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "occ",
            "version_increments_by_one_per_commit",
            version_increments_by_one_per_commit(factory).await,
        ),
        TestResult::from_result(
            "occ",
            "concurrent_updates_exactly_one_wins",
            concurrent_updates_exactly_one_wins(factory).await,
        ),
    ]
}

async fn stale_version_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert_request(fixture_request("req-1", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let rec = store
        .get_request("req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    store
        .update_request(rec.request.clone(), rec.version)
        .await
        .map_err(|e| format!("first update: {e}"))?;
    match store.update_request(rec.request, rec.version).await {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(other) => Err(format!("wrong error: {other}")),
        Ok(v) => Err(format!("stale write committed at version {v}")),
    }
}

async fn version_increments_by_one_per_commit<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert_request(fixture_request("req-1", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    for expected in 0..5i64 {
        let rec = store
            .get_request("req-1")
            .await
            .map_err(|e| format!("get: {e}"))?;
        if rec.version != expected {
            return Err(format!("read version {}, want {}", rec.version, expected));
        }
        let v = store
            .update_request(rec.request, rec.version)
            .await
            .map_err(|e| format!("update at {expected}: {e}"))?;
        if v != expected + 1 {
            return Err(format!("commit returned {}, want {}", v, expected + 1));
        }
    }
    Ok(())
}

/// N tasks race to update the same request from the same read version.
/// Exactly one commit may succeed.
async fn concurrent_updates_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    store
        .insert_request(fixture_request("req-1", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let rec = store
        .get_request("req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;

    let mut handles = Vec::new();
    for _ in 0..N {
        let store = store.clone();
        let request = rec.request.clone();
        let version = rec.version;
        handles.push(tokio::spawn(async move {
            store.update_request(request, version).await
        }));
    }

    let mut wins = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(_) => wins += 1,
            Err(StorageError::ConcurrentConflict { .. }) => conflicts += 1,
            Err(other) => return Err(format!("wrong error: {other}")),
        }
    }
    if wins != 1 || conflicts != N - 1 {
        return Err(format!("{wins} wins / {conflicts} conflicts, want 1 / {}", N - 1));
    }
    Ok(())
}
