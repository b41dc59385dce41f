//! Conformance test suite for `DepositStore` implementations.
//!
//! Backend-agnostic checks any `DepositStore` must pass:
//!
//! - **CRUD**: insert, read-back, not-found and duplicate-id errors
//! - **OCC**: stale-version rejection, concurrent exactly-one-wins
//! - **Attach**: commit-time global duplicate override, first writer
//!   wins under real concurrency
//! - **Folio**: process-wide uniqueness at commit
//! - **Sequence**: monotonic, gap-free under concurrency, seeded from
//!   the existing population
//!
//! Backend crates call [`run_conformance_suite`] with a factory that
//! creates a fresh, empty store for each test:
//!
//! ```ignore
//! let report = run_conformance_suite(|| async { MyStore::connect().await }).await;
//! assert_eq!(report.failed, 0, "{report}");
//! ```

mod attach;
mod crud;
mod folio;
mod occ;
mod sequence;

use std::fmt;
use std::future::Future;

use remit_core::{Channel, ChannelMetadata, ReportedFields, Request};

use crate::DepositStore;

/// Result of a single conformance test.
#[derive(Debug, Clone)]
pub struct TestResult {
    /// Test category (e.g. "occ", "attach").
    pub category: String,
    pub name: String,
    pub passed: bool,
    /// Error message if the test failed.
    pub message: Option<String>,
}

impl TestResult {
    fn from_result(category: &str, name: &str, result: Result<(), String>) -> Self {
        let (passed, message) = match result {
            Ok(()) => (true, None),
            Err(msg) => (false, Some(msg)),
        };
        Self {
            category: category.to_string(),
            name: name.to_string(),
            passed,
            message,
        }
    }
}

/// Aggregated report from a full conformance suite run.
#[derive(Debug, Clone)]
pub struct ConformanceReport {
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for ConformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Conformance: {}/{} passed ({} failed)",
            self.passed, self.total, self.failed
        )?;
        for r in &self.results {
            if !r.passed {
                writeln!(
                    f,
                    "  FAIL [{}/{}]: {}",
                    r.category,
                    r.name,
                    r.message.as_deref().unwrap_or("(no message)")
                )?;
            }
        }
        Ok(())
    }
}

/// Run the full conformance suite against a storage backend.
///
/// The `factory` is called once per test so every test starts from an
/// empty population.
pub async fn run_conformance_suite<S, F, Fut>(factory: F) -> ConformanceReport
where
    S: DepositStore,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let mut results = Vec::new();
    results.extend(crud::run(&factory).await);
    results.extend(occ::run(&factory).await);
    results.extend(attach::run(&factory).await);
    results.extend(folio::run(&factory).await);
    results.extend(sequence::run(&factory).await);

    let total = results.len();
    let passed = results.iter().filter(|r| r.passed).count();
    ConformanceReport {
        failed: total - passed,
        passed,
        total,
        results,
    }
}

/// Minimal request fixture shared by the suite.
fn fixture_request(id: &str, client_id: &str) -> Request {
    Request::new(
        id.to_string(),
        Channel::Chat,
        client_id.to_string(),
        "Conformance Client".to_string(),
        ReportedFields::default(),
        ChannelMetadata::default(),
        "2026-01-01T00:00:00Z".to_string(),
    )
}
