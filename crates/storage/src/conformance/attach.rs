use std::future::Future;
use std::sync::Arc;

use remit_core::{DuplicateKind, ExtractedFields, Receipt, Request, RequestState};
use rust_decimal::Decimal;

use super::{fixture_request, TestResult};
use crate::DepositStore;

pub(super) async fn run<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "attach",
            "fresh_fingerprint_commits_unclassified",
            fresh_fingerprint_commits_unclassified(factory).await,
        ),
        TestResult::from_result(
            "attach",
            "committed_holder_forces_global_classification",
            committed_holder_forces_global(factory).await,
        ),
        TestResult::from_result(
            "attach",
            "rejected_holder_does_not_block_reuse",
            rejected_holder_does_not_block(factory).await,
        ),
        TestResult::from_result(
            "attach",
            "concurrent_attaches_first_writer_wins",
            concurrent_attaches_first_writer_wins(factory).await,
        ),
    ]
}

fn with_receipt(mut request: Request, fingerprint: &str) -> Request {
    request.receipts.push(Receipt {
        fingerprint: fingerprint.to_string(),
        display_name: "deposit.pdf".to_string(),
        extracted: Some(ExtractedFields {
            amount: Some(Decimal::new(150_000_00, 2)),
            ..ExtractedFields::default()
        }),
        valid: true,
        reason: "matches the active account".to_string(),
        duplicate: DuplicateKind::None,
        discard_reason: None,
    });
    request
}

async fn fresh_fingerprint_commits_unclassified<S, F, Fut>(factory: &F) -> Result<(), String>
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
    let request = with_receipt(fixture_request("req-1", "c1"), "sha256:aaaa");
    let (kind, version) = store
        .commit_attach(request, 0, 0)
        .await
        .map_err(|e| format!("commit_attach: {e}"))?;
    if kind != DuplicateKind::None {
        return Err(format!("fresh fingerprint classified as {kind:?}"));
    }
    if version != 1 {
        return Err(format!("commit returned version {version}, want 1"));
    }
    let rec = store
        .get_request("req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.request.receipts.len() != 1 {
        return Err("attached receipt was not persisted".to_string());
    }
    Ok(())
}

async fn committed_holder_forces_global<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    store
        .insert_request(with_receipt(fixture_request("req-a", "c1"), "sha256:aaaa"))
        .await
        .map_err(|e| format!("insert origin: {e}"))?;
    store
        .insert_request(fixture_request("req-b", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let request = with_receipt(fixture_request("req-b", "c1"), "sha256:aaaa");
    let (kind, _) = store
        .commit_attach(request, 0, 0)
        .await
        .map_err(|e| format!("commit_attach: {e}"))?;
    match kind {
        DuplicateKind::Global { origin_request_id } if origin_request_id == "req-a" => Ok(()),
        other => Err(format!("want Global from req-a, got {other:?}")),
    }
}

async fn rejected_holder_does_not_block<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut origin = with_receipt(fixture_request("req-a", "c1"), "sha256:aaaa");
    origin.state = RequestState::Rejected;
    store
        .insert_request(origin)
        .await
        .map_err(|e| format!("insert origin: {e}"))?;
    store
        .insert_request(fixture_request("req-b", "c1"))
        .await
        .map_err(|e| format!("insert: {e}"))?;

    let request = with_receipt(fixture_request("req-b", "c1"), "sha256:aaaa");
    let (kind, _) = store
        .commit_attach(request, 0, 0)
        .await
        .map_err(|e| format!("commit_attach: {e}"))?;
    if kind != DuplicateKind::None {
        return Err(format!("rejected holder should not block, got {kind:?}"));
    }
    Ok(())
}

/// Two requests of the same client race to attach the same content.
/// Exactly one receipt stays unclassified; the other must come back
/// `Global` pointing at the winner.
async fn concurrent_attaches_first_writer_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    for id in ["req-a", "req-b"] {
        store
            .insert_request(fixture_request(id, "c1"))
            .await
            .map_err(|e| format!("insert {id}: {e}"))?;
    }

    let mut handles = Vec::new();
    for id in ["req-a", "req-b"] {
        let store = store.clone();
        let request = with_receipt(fixture_request(id, "c1"), "sha256:aaaa");
        handles.push(tokio::spawn(
            async move { store.commit_attach(request, 0, 0).await },
        ));
    }

    let mut fresh = 0;
    let mut global = 0;
    for handle in handles {
        let (kind, _) = handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("commit_attach: {e}"))?;
        match kind {
            DuplicateKind::None => fresh += 1,
            DuplicateKind::Global { .. } => global += 1,
            DuplicateKind::Local { .. } => return Err("unexpected local classification".into()),
        }
    }
    if fresh != 1 || global != 1 {
        return Err(format!("{fresh} fresh / {global} global, want 1 / 1"));
    }
    Ok(())
}
