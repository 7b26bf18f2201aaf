// # dnsync-core
//
// Core library for declarative DNS reconciliation.
//
// ## Architecture Overview
//
// A desired-state YAML document is taken through three stages:
// - **Validation**: `validation` checks every record against the record-type
//   grammar and reports all problems at once
// - **Reconciliation**: `reconcile` diffs the validated `DesiredState` against
//   a fresh snapshot from a `DnsProvider` and applies the minimal changeset
// - **Verification**: `verify` asks several independent `DnsResolver`s whether
//   the declared records are externally visible
//
// Provider and resolver implementations live in their own crates and are
// plugged in through the traits in `traits` and the `ProviderRegistry`.
//
// ## Design Principles
//
// 1. **Stateless**: every run re-reads the document and the provider; nothing
//    is cached between invocations
// 2. **Idempotent**: re-running a sync on a converged zone changes nothing
// 3. **Library-First**: the CLI is a thin layer over this crate
// 4. **Best effort**: a failed mutation is reported, the rest of the plan
//    still runs

pub mod config;
pub mod document;
pub mod error;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod traits;
pub mod validation;
pub mod verify;

// Re-export core types for convenience
pub use config::{ProviderConfig, SyncConfig, VerifierConfig};
pub use document::{DesiredRecord, DesiredState, DesiredStateDocument, RecordLocation, Section};
pub use error::{Error, Result};
pub use reconcile::{
    ApplyReport, PlannedAction, PlannedChange, ReconcileStats, ReconciliationPlan, apply,
    reconcile,
};
pub use record::{LiveRecord, RecordKey, RecordSpec, RecordType, RecordValue, SrvData, Ttl};
pub use registry::ProviderRegistry;
pub use traits::{DnsProvider, DnsProviderFactory, DnsResolver, LookupFailure};
pub use validation::{RecordError, ValidationError, ValidationReport};
pub use verify::{PropagationVerifier, VerificationReport, VerificationStatus};
