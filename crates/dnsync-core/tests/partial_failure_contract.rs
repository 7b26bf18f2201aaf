//! Contract Test: Best-Effort Application
//!
//! Constraints verified:
//! - A failed mutation is recorded and counted, the rest of the plan runs
//! - Nothing is rolled back
//! - A failure to read live state is fatal and no mutation happens
//! - Mutations are attempted once (no retry inside the engine)
//!
//! If this test fails, one bad record could block or corrupt a whole sync.

mod common;

use common::*;
use dnsync_core::reconcile::{self, Operation, OperationStatus};
use dnsync_core::record::RecordType;

const DOCUMENT: &str = r#"
domain: example.com
frontend:
  - { name: "@", type: A, content: 203.0.113.5 }
  - { name: www, type: CNAME, content: example.com }
backend:
  - { name: api, type: A, content: 203.0.113.10, proxied: false }
"#;

#[tokio::test]
async fn failed_operation_does_not_block_others() {
    let desired = load(DOCUMENT);
    let provider = InMemoryProvider::with_records(vec![live(
        "rec-api",
        "api.example.com",
        RecordType::A,
        "198.51.100.1",
    )]);
    provider.fail_mutations_for("www.example.com");

    let (plan, report) = reconcile::sync(&desired, &provider).await.unwrap();

    assert_eq!(plan.summary().create, 2);
    assert_eq!(plan.summary().update, 1);

    assert!(!report.is_success());
    assert_eq!(report.stats.created, 1);
    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.outcomes.len(), 3);

    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].key.to_string(), "www.example.com:CNAME");
    assert_eq!(failures[0].operation, Operation::Create);
    assert!(matches!(&failures[0].status, OperationStatus::Failed(msg) if msg.contains("injected")));

    // the successful operations stay applied
    assert_eq!(provider.find("example.com", RecordType::A).len(), 1);
    assert_eq!(
        provider.find("api.example.com", RecordType::A)[0].record.content(),
        Some("203.0.113.10")
    );
    assert_eq!(provider.create_calls(), 2);
}

#[tokio::test]
async fn rerun_retries_only_what_failed() {
    let desired = load(DOCUMENT);
    let provider = InMemoryProvider::new();
    provider.fail_mutations_for("www.example.com");

    reconcile::sync(&desired, &provider).await.unwrap();
    let plan = reconcile::plan(&desired, &provider).await.unwrap();

    assert_eq!(plan.summary().create, 1);
    assert_eq!(plan.summary().unchanged, 2);
}

#[tokio::test]
async fn fetch_failure_aborts_before_any_mutation() {
    let desired = load(DOCUMENT);
    let provider = InMemoryProvider::new();
    provider.fail_listing();

    let result = reconcile::sync(&desired, &provider).await;

    assert!(result.is_err());
    assert_eq!(provider.mutation_calls(), 0);
}
