use std::future::Future;
use std::sync::Arc;

use super::{fixture_request, TestResult};
use crate::{DepositStore, StorageError};

pub(super) async fn run<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "folio",
            "taken_folio_is_rejected_at_commit",
            taken_folio_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "folio",
            "rewriting_own_folio_is_allowed",
            rewriting_own_folio_is_allowed(factory).await,
        ),
        TestResult::from_result(
            "folio",
            "concurrent_claims_of_one_folio_exactly_one_wins",
            concurrent_claims_exactly_one_wins(factory).await,
        ),
    ]
}

async fn taken_folio_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut holder = fixture_request("req-a", "c1");
    holder.folio = Some("NC-000007".to_string());
    store
        .insert_request(holder)
        .await
        .map_err(|e| format!("insert holder: {e}"))?;
    store
        .insert_request(fixture_request("req-b", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let mut claim = fixture_request("req-b", "c1");
    claim.folio = Some("NC-000007".to_string());
    match store.update_request(claim, 0).await {
        Err(StorageError::FolioInUse { folio }) if folio == "NC-000007" => Ok(()),
        Err(other) => Err(format!("wrong error: {other}")),
        Ok(_) => Err("second claim of the folio committed".to_string()),
    }
}

async fn rewriting_own_folio_is_allowed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut holder = fixture_request("req-a", "c1");
    holder.folio = Some("NC-000007".to_string());
    store
        .insert_request(holder.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    // Writing the same record back must not collide with itself.
    store
        .update_request(holder, 0)
        .await
        .map_err(|e| format!("rewrite: {e}"))?;
    Ok(())
}

async fn concurrent_claims_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for id in ["req-a", "req-b", "req-c"] {
        store
            .insert_request(fixture_request(id, "c1"))
            .await
            .map_err(|e| format!("insert {id}: {e}"))?;
    }

    let mut handles = Vec::new();
    for id in ["req-a", "req-b", "req-c"] {
        let store = store.clone();
        let mut claim = fixture_request(id, "c1");
        claim.folio = Some("NC-000042".to_string());
        handles.push(tokio::spawn(async move { store.update_request(claim, 0).await }));
    }

    let mut wins = 0;
    for handle in handles {
        match handle.await.map_err(|e| format!("join: {e}"))? {
            Ok(_) => wins += 1,
            Err(StorageError::FolioInUse { .. }) => {}
            Err(other) => return Err(format!("wrong error: {other}")),
        }
    }
    if wins != 1 {
        return Err(format!("{wins} claims won, want exactly 1"));
    }
    Ok(())
}
