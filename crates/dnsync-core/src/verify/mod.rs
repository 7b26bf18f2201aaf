//! Propagation verification
//!
//! After a sync, every declared record is looked up on several independent
//! public resolvers. A record counts as propagated only when *every*
//! resolver returns a matching answer. SRV records are not checked and are
//! reported as skipped.
//!
//! Lookups are sequential, one resolver at a time. The verifier pauses for a
//! fixed delay before every lookup except the first of the run, across all
//! records and resolvers, so public resolvers do not rate limit the run.

use crate::config::MIN_RESOLVERS;
use crate::document::DesiredState;
use crate::error::{Error, Result};
use crate::record::{
    RecordKey, RecordSpec, RecordType, normalize_hostname, qualify_name, strip_quotes,
};
use crate::traits::{DnsResolver, LookupFailure};
use std::collections::HashSet;
use std::fmt;
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default pause between consecutive lookups
pub const DEFAULT_LOOKUP_DELAY: Duration = Duration::from_millis(500);

/// What one resolver said about one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverOutcome {
    /// One of the answers matched the expected value
    Matched,
    /// Answers were returned but none matched
    Mismatch,
    /// The lookup produced no answer
    Failed(LookupFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverObservation {
    pub resolver: String,
    pub answers: Vec<String>,
    pub outcome: ResolverOutcome,
}

impl fmt::Display for ResolverObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ResolverOutcome::Matched => write!(f, "{}: ok", self.resolver),
            ResolverOutcome::Mismatch => {
                write!(f, "{}: got [{}]", self.resolver, self.answers.join(", "))
            }
            ResolverOutcome::Failed(failure) => write!(f, "{}: {}", self.resolver, failure),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Propagated,
    NotPropagated,
    /// Record type is not verified (SRV)
    Skipped,
}

/// Verification outcome for one declared record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    pub key: RecordKey,
    pub fqdn: String,
    pub record_type: RecordType,
    /// Value the resolvers are expected to return; `None` when skipped
    pub expected: Option<String>,
    pub status: VerificationStatus,
    pub observations: Vec<ResolverObservation>,
}

/// Outcome of one verification run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    pub results: Vec<VerificationResult>,
}

impl VerificationReport {
    fn count(&self, status: VerificationStatus) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }

    /// Number of records that were actually checked
    pub fn checked(&self) -> usize {
        self.results.len() - self.skipped()
    }

    pub fn propagated(&self) -> usize {
        self.count(VerificationStatus::Propagated)
    }

    pub fn not_propagated(&self) -> usize {
        self.count(VerificationStatus::NotPropagated)
    }

    pub fn skipped(&self) -> usize {
        self.count(VerificationStatus::Skipped)
    }

    /// True when every checked record propagated
    pub fn is_fully_propagated(&self) -> bool {
        self.not_propagated() == 0
    }

    pub fn unpropagated(&self) -> impl Iterator<Item = &VerificationResult> {
        self.results
            .iter()
            .filter(|result| result.status == VerificationStatus::NotPropagated)
    }
}

/// Checks desired records against independent resolvers
pub struct PropagationVerifier {
    resolvers: Vec<Box<dyn DnsResolver>>,
    lookup_delay: Duration,
}

impl PropagationVerifier {
    /// Create a verifier
    ///
    /// # Errors
    ///
    /// [`Error::Config`] when fewer than [`MIN_RESOLVERS`] distinct
    /// resolvers are given.
    pub fn new(resolvers: Vec<Box<dyn DnsResolver>>, lookup_delay: Duration) -> Result<Self> {
        let distinct: HashSet<&str> = resolvers
            .iter()
            .map(|resolver| resolver.resolver_name())
            .collect();
        if distinct.len() < MIN_RESOLVERS {
            return Err(Error::config(format!(
                "Propagation verification needs at least {} distinct resolvers, got {}",
                MIN_RESOLVERS,
                distinct.len()
            )));
        }

        Ok(Self {
            resolvers,
            lookup_delay,
        })
    }

    pub fn resolver_names(&self) -> Vec<&str> {
        self.resolvers
            .iter()
            .map(|resolver| resolver.resolver_name())
            .collect()
    }

    /// Verify every record of `desired`
    pub async fn verify(&self, desired: &DesiredState) -> VerificationReport {
        let mut report = VerificationReport::default();
        let mut started = false;

        info!(
            "Verifying {} records on {}",
            desired.len(),
            self.resolver_names().join(", ")
        );

        for record in desired.specs() {
            let fqdn = qualify_name(&record.name, desired.domain());
            let key = desired.key(record);

            let Some(expected) = expected_answer(record) else {
                debug!("Skipping verification of {}", key);
                report.results.push(VerificationResult {
                    key,
                    fqdn,
                    record_type: record.record_type.clone(),
                    expected: None,
                    status: VerificationStatus::Skipped,
                    observations: Vec::new(),
                });
                continue;
            };

            let observations = self
                .observe(&fqdn, &record.record_type, &expected, &mut started)
                .await;
            let status = if observations
                .iter()
                .all(|observation| observation.outcome == ResolverOutcome::Matched)
            {
                VerificationStatus::Propagated
            } else {
                VerificationStatus::NotPropagated
            };

            match status {
                VerificationStatus::Propagated => debug!("{} propagated", key),
                _ => warn!("{} not yet propagated (expected {})", key, expected),
            }

            report.results.push(VerificationResult {
                key,
                fqdn,
                record_type: record.record_type.clone(),
                expected: Some(expected),
                status,
                observations,
            });
        }

        info!(
            "Verification finished: {}/{} propagated, {} skipped",
            report.propagated(),
            report.checked(),
            report.skipped()
        );
        report
    }

    async fn observe(
        &self,
        fqdn: &str,
        record_type: &RecordType,
        expected: &str,
        started: &mut bool,
    ) -> Vec<ResolverObservation> {
        let mut observations = Vec::with_capacity(self.resolvers.len());

        for resolver in &self.resolvers {
            if *started && !self.lookup_delay.is_zero() {
                tokio::time::sleep(self.lookup_delay).await;
            }
            *started = true;

            let observation = match resolver.lookup(fqdn, record_type).await {
                Ok(answers) => {
                    let outcome = if answers
                        .iter()
                        .any(|answer| answer_matches(record_type, expected, answer))
                    {
                        ResolverOutcome::Matched
                    } else {
                        ResolverOutcome::Mismatch
                    };
                    ResolverObservation {
                        resolver: resolver.resolver_name().to_string(),
                        answers,
                        outcome,
                    }
                }
                Err(failure) => ResolverObservation {
                    resolver: resolver.resolver_name().to_string(),
                    answers: Vec::new(),
                    outcome: ResolverOutcome::Failed(failure),
                },
            };

            debug!("{} {} via {}", fqdn, record_type, observation);
            observations.push(observation);
        }

        observations
    }
}

/// Answer a resolver should return for `record`, or `None` if the type is
/// not verified
///
/// MX answers are `"<priority> <exchange>"`.
pub fn expected_answer(record: &RecordSpec) -> Option<String> {
    match record.record_type {
        RecordType::Srv => None,
        RecordType::Mx => Some(format!(
            "{} {}",
            record.priority.unwrap_or_default(),
            record.content()?
        )),
        _ => record.content().map(str::to_string),
    }
}

/// Type-aware comparison of an expected value with one resolver answer
pub fn answer_matches(record_type: &RecordType, expected: &str, observed: &str) -> bool {
    let expected = expected.trim();
    let observed = observed.trim();

    match record_type {
        RecordType::Aaaa => match (expected.parse::<Ipv6Addr>(), observed.parse::<Ipv6Addr>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        },
        RecordType::Cname | RecordType::Ns => {
            normalize_hostname(expected) == normalize_hostname(observed)
        }
        RecordType::Txt => strip_quotes(expected) == strip_quotes(observed),
        RecordType::Mx => match (split_mx(expected), split_mx(observed)) {
            (Some((a_pref, a_host)), Some((b_pref, b_host))) => {
                a_pref == b_pref && normalize_hostname(a_host) == normalize_hostname(b_host)
            }
            _ => false,
        },
        _ => expected == observed,
    }
}

fn split_mx(answer: &str) -> Option<(u16, &str)> {
    let (preference, exchange) = answer.split_once(char::is_whitespace)?;
    Some((preference.parse().ok()?, exchange.trim()))
}
