// # DNS Resolver Trait
//
// Defines the interface to one independent recursive resolver, used by the
// propagation verifier to observe what the outside world sees.
//
// ## Implementations
//
// - hickory: `dnsync-resolver-hickory` crate (one instance per nameserver)
// - Tests: scripted resolvers in `dnsync-core/tests/common`

use crate::record::RecordType;
use async_trait::async_trait;
use thiserror::Error;

/// Why a lookup produced no answer
///
/// All three count as "not yet propagated"; they are kept apart so that the
/// report tells the operator what the resolver actually said.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// NXDOMAIN: the name does not exist
    #[error("name does not exist")]
    NameNotFound,

    /// The name exists but has no record of the queried type
    #[error("no record of this type present")]
    NoRecords,

    /// Timeout, network failure, SERVFAIL, ...
    #[error("lookup error: {0}")]
    Other(String),
}

/// Trait for resolver implementations
///
/// Answers are returned as text, one entry per resource record:
///
/// | Type | Format |
/// |---|---|
/// | A, AAAA | IP literal |
/// | CNAME, NS | host name, trailing dot allowed |
/// | TXT | character strings concatenated, without quotes |
/// | MX | `"<preference> <exchange>"` |
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Look up `name` for `record_type`
    async fn lookup(
        &self,
        name: &str,
        record_type: &RecordType,
    ) -> std::result::Result<Vec<String>, LookupFailure>;

    /// Identifies the resolver in reports (e.g. `"1.1.1.1"`)
    fn resolver_name(&self) -> &str;
}
