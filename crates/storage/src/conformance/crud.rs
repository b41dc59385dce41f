use std::future::Future;

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
            "crud",
            "insert_then_read_back_at_version_0",
            insert_then_read_back(factory).await,
        ),
        TestResult::from_result(
            "crud",
            "missing_request_is_not_found",
            missing_request_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "crud",
            "duplicate_id_is_rejected",
            duplicate_id_is_rejected(factory).await,
        ),
        TestResult::from_result(
            "crud",
            "client_listing_is_scoped_and_ordered",
            client_listing_is_scoped_and_ordered(factory).await,
        ),
    ]
}

async fn insert_then_read_back<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let request = fixture_request("req-1", "c1");
    store
        .insert_request(request.clone())
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let rec = store
        .get_request("req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 0 {
        return Err(format!("fresh request at version {}, want 0", rec.version));
    }
    if rec.request != request {
        return Err("read-back differs from inserted request".to_string());
    }
    Ok(())
}

async fn missing_request_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    match store.get_request("req-missing").await {
        Err(StorageError::RequestNotFound { .. }) => Ok(()),
        Err(other) => Err(format!("wrong error: {other}")),
        Ok(_) => Err("read of a missing request succeeded".to_string()),
    }
}

async fn duplicate_id_is_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
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
    match store.insert_request(fixture_request("req-1", "c2")).await {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        Err(other) => Err(format!("wrong error: {other}")),
        Ok(()) => Err("second insert with the same id succeeded".to_string()),
    }
}

async fn client_listing_is_scoped_and_ordered<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    for (id, client) in [("req-b", "c1"), ("req-a", "c1"), ("req-c", "c2")] {
        store
            .insert_request(fixture_request(id, client))
            .await
            .map_err(|e| format!("insert {id}: {e}"))?;
    }
    let listed = store
        .list_requests_for_client("c1")
        .await
        .map_err(|e| format!("list: {e}"))?;
    let ids: Vec<&str> = listed.iter().map(|r| r.request.id.as_str()).collect();
    if ids != ["req-b", "req-a"] {
        return Err(format!("want insertion order [req-b, req-a], got {ids:?}"));
    }
    Ok(())
}
