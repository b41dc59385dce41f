use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;

use super::{fixture_request, TestResult};
use crate::DepositStore;

/// Concurrent allocations per racing test.
const N: usize = 20;

pub(super) async fn run<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "sequence",
            "values_are_strictly_increasing",
            values_are_strictly_increasing(factory).await,
        ),
        TestResult::from_result(
            "sequence",
            "floor_is_seeded_from_population_folios",
            floor_is_seeded_from_population(factory).await,
        ),
        TestResult::from_result(
            "sequence",
            "concurrent_allocations_are_distinct",
            concurrent_allocations_are_distinct(factory).await,
        ),
    ]
}

async fn values_are_strictly_increasing<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut previous = 0;
    for _ in 0..10 {
        let value = store
            .next_sequence_value("NC")
            .await
            .map_err(|e| format!("next: {e}"))?;
        if value <= previous {
            return Err(format!("{value} after {previous} is not increasing"));
        }
        previous = value;
    }
    Ok(())
}

async fn floor_is_seeded_from_population<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = factory().await;
    let mut imported = fixture_request("req-a", "c1");
    imported.folio = Some("NC-000099".to_string());
    store
        .insert_request(imported)
        .await
        .map_err(|e| format!("insert: {e}"))?;
    let value = store
        .next_sequence_value("NC")
        .await
        .map_err(|e| format!("next: {e}"))?;
    if value != 100 {
        return Err(format!("want 100 after imported NC-000099, got {value}"));
    }
    Ok(())
}

async fn concurrent_allocations_are_distinct<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let store = Arc::new(factory().await);
    let mut handles = Vec::new();
    for _ in 0..N {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.next_sequence_value("NC").await },
        ));
    }

    let mut seen = BTreeSet::new();
    for handle in handles {
        let value = handle
            .await
            .map_err(|e| format!("join: {e}"))?
            .map_err(|e| format!("next: {e}"))?;
        if !seen.insert(value) {
            return Err(format!("value {value} allocated twice"));
        }
    }
    if seen.len() != N {
        return Err(format!("{} distinct values, want {N}", seen.len()));
    }
    Ok(())
}
