use remit_storage::conformance::run_conformance_suite;
use remit_storage::MemoryStore;

#[tokio::test]
async fn memory_store_passes_the_conformance_suite() {
    let report = run_conformance_suite(|| async { MemoryStore::new() }).await;
    assert_eq!(report.failed, 0, "{report}");
}
