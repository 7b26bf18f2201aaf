use super::{PlannedAction, ReconciliationPlan};
use crate::record::RecordKey;
use crate::traits::DnsProvider;
use std::fmt;
use tracing::{info, warn};

/// Provider mutation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Applied,
    Failed(String),
}

/// Result of one provider mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub key: RecordKey,
    pub operation: Operation,
    pub status: OperationStatus,
}

impl OperationOutcome {
    pub fn is_applied(&self) -> bool {
        self.status == OperationStatus::Applied
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            OperationStatus::Applied => write!(f, "{} {}: ok", self.operation, self.key),
            OperationStatus::Failed(reason) => {
                write!(f, "{} {}: failed: {}", self.operation, self.key, reason)
            }
        }
    }
}

/// Aggregate counters of one apply pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
}

impl fmt::Display for ReconcileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "created: {}, updated: {}, deleted: {}, unchanged: {}, failed: {}",
            self.created, self.updated, self.deleted, self.unchanged, self.failed
        )
    }
}

/// Outcome of applying a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub outcomes: Vec<OperationOutcome>,
    pub stats: ReconcileStats,
}

impl ApplyReport {
    /// True when no mutation failed
    pub fn is_success(&self) -> bool {
        self.stats.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_applied())
    }
}

/// Apply every mutation of `plan`, one at a time
///
/// Each operation is independent: a failure is logged, counted and recorded,
/// and the next entry is processed. Nothing is rolled back.
pub async fn apply(plan: &ReconciliationPlan, provider: &dyn DnsProvider) -> ApplyReport {
    let mut report = ApplyReport::default();

    for change in plan.changes() {
        let (operation, result) = match &change.action {
            PlannedAction::Unchanged { .. } => {
                report.stats.unchanged += 1;
                continue;
            }
            PlannedAction::Create { record } => (
                Operation::Create,
                provider.create_record(record).await.map(|id| {
                    info!("Created {} -> {} (id {})", change.key, record.value, id);
                }),
            ),
            PlannedAction::Update { id, record, .. } => (
                Operation::Update,
                provider.update_record(id, record).await.map(|()| {
                    info!("Updated {} -> {}", change.key, record.value);
                }),
            ),
            PlannedAction::Delete { id, .. } => (
                Operation::Delete,
                provider.delete_record(id).await.map(|()| {
                    info!("Deleted {} (id {})", change.key, id);
                }),
            ),
        };

        let status = match result {
            Ok(()) => {
                match operation {
                    Operation::Create => report.stats.created += 1,
                    Operation::Update => report.stats.updated += 1,
                    Operation::Delete => report.stats.deleted += 1,
                }
                OperationStatus::Applied
            }
            Err(e) => {
                warn!("Failed to {} {}: {}", operation, change.key, e);
                report.stats.failed += 1;
                OperationStatus::Failed(e.to_string())
            }
        };

        report.outcomes.push(OperationOutcome {
            key: change.key.clone(),
            operation,
            status,
        });
    }

    info!("Reconciliation of {} finished: {}", plan.domain(), report.stats);
    report
}
