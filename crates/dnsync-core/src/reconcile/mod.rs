//! Desired-vs-live reconciliation
//!
//! The reconciler is stateless: every run starts from the validated desired
//! state and a fresh snapshot of the provider, and produces a
//! [`ReconciliationPlan`] with one entry per record key.
//!
//! ```text
//! DesiredState ──┐
//!                ├── reconcile() ── ReconciliationPlan ── apply() ── ApplyReport
//! list_records() ┘                                          │
//!                                                           ▼
//!                                                      DnsProvider
//! ```
//!
//! ## Matching
//!
//! Records are matched by [`RecordKey`] (fully-qualified name, type). Only
//! live records inside the managed domain are considered. When several live
//! records share a desired key, one whose value already matches is kept;
//! otherwise the first is replaced; the others are left alone. Live records
//! whose key is not declared are deleted, except MX, TXT and CAA records.

mod apply;

pub use apply::{ApplyReport, Operation, OperationOutcome, OperationStatus, ReconcileStats, apply};

use crate::document::DesiredState;
use crate::error::Result;
use crate::record::{LiveRecord, RecordKey, RecordSpec, in_domain};
use crate::traits::DnsProvider;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use tracing::{debug, info};

/// What to do for one record key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    /// No live record: create `record` (fully-qualified name)
    Create { record: RecordSpec },

    /// Live record `id` differs: replace it with `record`
    Update {
        id: String,
        record: RecordSpec,
        current: RecordSpec,
    },

    /// Live record `id` is not declared and not preserved
    Delete { id: String, current: RecordSpec },

    /// Live record `id` already matches
    Unchanged { id: String },
}

impl PlannedAction {
    /// Whether applying this action calls the provider
    pub fn is_mutation(&self) -> bool {
        !matches!(self, PlannedAction::Unchanged { .. })
    }
}

/// One entry of a reconciliation plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedChange {
    pub key: RecordKey,
    pub action: PlannedAction,
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.action {
            PlannedAction::Create { record } => {
                write!(f, "+ create {} -> {}", self.key, record.value)
            }
            PlannedAction::Update {
                record, current, ..
            } => write!(
                f,
                "~ update {}: {} -> {}",
                self.key, current.value, record.value
            ),
            PlannedAction::Delete { current, .. } => {
                write!(f, "- delete {} ({})", self.key, current.value)
            }
            PlannedAction::Unchanged { .. } => write!(f, "= unchanged {}", self.key),
        }
    }
}

/// Per-action counts of a plan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub unchanged: usize,
}

impl fmt::Display for PlanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to create, {} to update, {} to delete, {} unchanged",
            self.create, self.update, self.delete, self.unchanged
        )
    }
}

/// Ephemeral result of diffing desired against live state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationPlan {
    domain: String,
    changes: Vec<PlannedChange>,
}

impl ReconciliationPlan {
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Entries in processing order: declared records first, then deletions
    pub fn changes(&self) -> &[PlannedChange] {
        &self.changes
    }

    /// Entries that call the provider
    pub fn mutations(&self) -> impl Iterator<Item = &PlannedChange> {
        self.changes.iter().filter(|change| change.action.is_mutation())
    }

    pub fn summary(&self) -> PlanSummary {
        let mut summary = PlanSummary::default();
        for change in &self.changes {
            match change.action {
                PlannedAction::Create { .. } => summary.create += 1,
                PlannedAction::Update { .. } => summary.update += 1,
                PlannedAction::Delete { .. } => summary.delete += 1,
                PlannedAction::Unchanged { .. } => summary.unchanged += 1,
            }
        }
        summary
    }

    /// True when live state already equals desired state
    pub fn is_converged(&self) -> bool {
        self.mutations().next().is_none()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Diff desired state against a live snapshot
///
/// Pure function: the same inputs always yield the same plan.
pub fn reconcile(desired: &DesiredState, live: &[LiveRecord]) -> ReconciliationPlan {
    let domain = desired.domain();

    let managed: Vec<&LiveRecord> = live
        .iter()
        .filter(|record| in_domain(&record.record.name, domain))
        .collect();
    if managed.len() < live.len() {
        debug!(
            "Ignoring {} live records outside {}",
            live.len() - managed.len(),
            domain
        );
    }

    let mut live_by_key: BTreeMap<RecordKey, Vec<&LiveRecord>> = BTreeMap::new();
    for record in managed.iter().copied() {
        live_by_key.entry(record.key()).or_default().push(record);
    }

    let mut claimed: HashSet<&str> = HashSet::new();
    let mut processed: HashSet<RecordKey> = HashSet::with_capacity(desired.len());
    let mut changes = Vec::with_capacity(desired.len() + managed.len());

    for desired_record in desired.records() {
        let spec = &desired_record.spec;
        let key = desired.key(spec);

        let candidates: Vec<&LiveRecord> = live_by_key
            .get(&key)
            .map(|records| {
                records
                    .iter()
                    .copied()
                    .filter(|record| !claimed.contains(record.id.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let action = match candidates
            .iter()
            .find(|record| spec.same_value(&record.record))
            .or_else(|| candidates.first())
            .copied()
        {
            None => PlannedAction::Create {
                record: spec.qualified(domain),
            },
            Some(current) => {
                claimed.insert(current.id.as_str());
                if spec.same_value(&current.record) {
                    PlannedAction::Unchanged {
                        id: current.id.clone(),
                    }
                } else {
                    PlannedAction::Update {
                        id: current.id.clone(),
                        record: spec.qualified(domain),
                        current: current.record.clone(),
                    }
                }
            }
        };

        processed.insert(key.clone());
        changes.push(PlannedChange { key, action });
    }

    for record in managed {
        let key = record.key();
        if processed.contains(&key) {
            if !claimed.contains(record.id.as_str()) {
                debug!("Keeping extra live record {} ({})", key, record.id);
            }
            continue;
        }
        if record.record.record_type.is_preserved() {
            debug!("Preserving undeclared record {}", key);
            continue;
        }
        changes.push(PlannedChange {
            key,
            action: PlannedAction::Delete {
                id: record.id.clone(),
                current: record.record.clone(),
            },
        });
    }

    ReconciliationPlan {
        domain: domain.to_string(),
        changes,
    }
}

/// Fetch live state and compute the plan without mutating anything
///
/// A failure to read live state is fatal and returned as an error.
pub async fn plan(desired: &DesiredState, provider: &dyn DnsProvider) -> Result<ReconciliationPlan> {
    let live = provider.list_records().await?;
    info!(
        "Fetched {} live records from {}",
        live.len(),
        provider.provider_name()
    );

    let plan = reconcile(desired, &live);
    info!("Plan for {}: {}", plan.domain(), plan.summary());
    Ok(plan)
}

/// Fetch, diff and apply in one pass
///
/// Only the live-state fetch can fail the call; individual mutation failures
/// are recorded in the returned [`ApplyReport`].
pub async fn sync(
    desired: &DesiredState,
    provider: &dyn DnsProvider,
) -> Result<(ReconciliationPlan, ApplyReport)> {
    let plan = plan(desired, provider).await?;
    let report = apply(&plan, provider).await;
    Ok((plan, report))
}
