//! Contract Test: Idempotent Reconciliation
//!
//! Constraints verified:
//! - A sync followed by a fresh reconcile yields an all-Unchanged plan
//! - A second sync performs no provider mutation
//! - Every run reads a fresh snapshot (no cached state between runs)
//!
//! If this test fails, repeated syncs would churn the zone.

mod common;

use common::*;
use dnsync_core::DnsProvider;
use dnsync_core::reconcile::{self, PlannedAction};
use dnsync_core::record::RecordType;

#[tokio::test]
async fn second_sync_is_a_no_op() {
    let desired = load(FULL_DOCUMENT);
    let provider = InMemoryProvider::new();

    let (plan, report) = reconcile::sync(&desired, &provider).await.unwrap();
    assert_eq!(plan.summary().create, desired.len());
    assert!(report.is_success(), "{:?}", report);
    assert_eq!(report.stats.created, desired.len());

    let (plan, report) = reconcile::sync(&desired, &provider).await.unwrap();
    assert!(plan.is_converged(), "second plan should be empty: {:?}", plan);
    assert!(
        plan.changes()
            .iter()
            .all(|change| matches!(change.action, PlannedAction::Unchanged { .. }))
    );
    assert_eq!(report.stats.unchanged, desired.len());

    assert_eq!(provider.mutation_calls(), desired.len());
    assert_eq!(provider.list_calls(), 2);
}

#[tokio::test]
async fn drift_is_repaired_then_converges() {
    let desired = load(
        "domain: example.com\nfrontend:\n  - { name: api, type: A, content: 1.2.3.4, proxied: false }\n",
    );
    let provider = InMemoryProvider::with_records(vec![
        live("rec-1", "api.example.com", RecordType::A, "5.6.7.8"),
        live("rec-2", "stale.example.com", RecordType::A, "5.6.7.8"),
    ]);

    let (_, report) = reconcile::sync(&desired, &provider).await.unwrap();
    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.deleted, 1);

    let (plan, _) = reconcile::sync(&desired, &provider).await.unwrap();
    assert!(plan.is_converged());

    let api = provider.find("api.example.com", RecordType::A);
    assert_eq!(api.len(), 1);
    assert_eq!(api[0].id, "rec-1");
    assert_eq!(api[0].record.content(), Some("1.2.3.4"));
    assert!(provider.find("stale.example.com", RecordType::A).is_empty());
}

#[tokio::test]
async fn external_change_is_seen_by_next_run() {
    let desired = load(
        "domain: example.com\nfrontend:\n  - { name: \"@\", type: A, content: 203.0.113.5 }\n",
    );
    let provider = InMemoryProvider::new();

    reconcile::sync(&desired, &provider).await.unwrap();

    let id = provider.snapshot()[0].id.clone();
    provider.delete_record(&id).await.unwrap();

    let plan = reconcile::plan(&desired, &provider).await.unwrap();
    assert_eq!(plan.summary().create, 1);
}
