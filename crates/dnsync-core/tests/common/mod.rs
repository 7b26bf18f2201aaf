//! Test doubles and common utilities for reconciliation contract tests
//!
//! The in-memory provider behaves like a real zone: mutations change what
//! the next `list_records()` returns, so a second sync observes the first.

#![allow(dead_code)]

use async_trait::async_trait;
use dnsync_core::error::{Error, Result};
use dnsync_core::record::{LiveRecord, RecordSpec, RecordType};
use dnsync_core::traits::{DnsProvider, DnsResolver, LookupFailure};
use dnsync_core::{DesiredState, DesiredStateDocument};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// A DnsProvider backed by a Vec, with call counters and injectable failures
#[derive(Default)]
pub struct InMemoryProvider {
    records: Mutex<Vec<LiveRecord>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    /// Fully-qualified names whose mutations fail
    failing_names: Mutex<HashSet<String>>,
    fail_listing: AtomicBool,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing zone
    pub fn with_records(records: Vec<LiveRecord>) -> Self {
        let provider = Self::new();
        *provider.records.lock().unwrap() = records;
        provider
    }

    /// Make every create/update/delete touching `fqdn` fail
    pub fn fail_mutations_for(&self, fqdn: &str) {
        self.failing_names
            .lock()
            .unwrap()
            .insert(fqdn.to_ascii_lowercase());
    }

    /// Make `list_records()` fail, as if a page returned an error
    pub fn fail_listing(&self) {
        self.fail_listing.store(true, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> Vec<LiveRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn find(&self, fqdn: &str, record_type: RecordType) -> Vec<LiveRecord> {
        self.snapshot()
            .into_iter()
            .filter(|record| {
                record.record.name.eq_ignore_ascii_case(fqdn)
                    && record.record.record_type == record_type
            })
            .collect()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Total number of create/update/delete calls
    pub fn mutation_calls(&self) -> usize {
        self.create_calls() + self.update_calls() + self.delete_calls()
    }

    fn check_failure(&self, fqdn: &str) -> Result<()> {
        if self
            .failing_names
            .lock()
            .unwrap()
            .contains(&fqdn.to_ascii_lowercase())
        {
            return Err(Error::provider("memory", format!("injected failure for {}", fqdn)));
        }
        Ok(())
    }

    /// What the provider stores: proxy flag resolved like a real zone would
    fn stored(record: &RecordSpec) -> RecordSpec {
        RecordSpec {
            proxied: Some(record.effective_proxied()),
            ..record.clone()
        }
    }
}

#[async_trait]
impl DnsProvider for InMemoryProvider {
    async fn list_records(&self) -> Result<Vec<LiveRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::http("page 2: 500 Internal Server Error"));
        }
        Ok(self.snapshot())
    }

    async fn create_record(&self, record: &RecordSpec) -> Result<String> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&record.name)?;

        let id = format!("rec-new-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records
            .lock()
            .unwrap()
            .push(LiveRecord::new(id.clone(), Self::stored(record)));
        Ok(id)
    }

    async fn update_record(&self, record_id: &str, record: &RecordSpec) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(&record.name)?;

        let mut records = self.records.lock().unwrap();
        let existing = records
            .iter_mut()
            .find(|live| live.id == record_id)
            .ok_or_else(|| Error::not_found(record_id.to_string()))?;
        existing.record = Self::stored(record);
        Ok(())
    }

    async fn delete_record(&self, record_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        let mut records = self.records.lock().unwrap();
        let index = records
            .iter()
            .position(|live| live.id == record_id)
            .ok_or_else(|| Error::not_found(record_id.to_string()))?;
        self.check_failure(&records[index].record.name)?;
        records.remove(index);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

/// A DnsResolver that answers from a fixed table
pub struct ScriptedResolver {
    name: String,
    answers: HashMap<(String, RecordType), std::result::Result<Vec<String>, LookupFailure>>,
    lookups: AtomicUsize,
}

impl ScriptedResolver {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            answers: HashMap::new(),
            lookups: AtomicUsize::new(0),
        }
    }

    /// Answer `fqdn`/`record_type` with `values`
    pub fn answer(mut self, fqdn: &str, record_type: RecordType, values: &[&str]) -> Self {
        self.answers.insert(
            (fqdn.to_string(), record_type),
            Ok(values.iter().map(|value| value.to_string()).collect()),
        );
        self
    }

    /// Fail `fqdn`/`record_type` with `failure`
    pub fn fail(mut self, fqdn: &str, record_type: RecordType, failure: LookupFailure) -> Self {
        self.answers.insert((fqdn.to_string(), record_type), Err(failure));
        self
    }

    pub fn boxed(self) -> Box<dyn DnsResolver> {
        Box::new(self)
    }
}

#[async_trait]
impl DnsResolver for ScriptedResolver {
    async fn lookup(
        &self,
        name: &str,
        record_type: &RecordType,
    ) -> std::result::Result<Vec<String>, LookupFailure> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.answers
            .get(&(name.to_string(), record_type.clone()))
            .cloned()
            .unwrap_or(Err(LookupFailure::NameNotFound))
    }

    fn resolver_name(&self) -> &str {
        &self.name
    }
}

/// Live record as the provider would report it
pub fn live(id: &str, fqdn: &str, record_type: RecordType, content: &str) -> LiveRecord {
    let proxied = record_type.is_proxiable();
    LiveRecord::new(
        id,
        RecordSpec::new(fqdn, record_type, content).with_proxied(proxied),
    )
}

/// Parse and validate a YAML document, panicking on any problem
pub fn load(yaml: &str) -> DesiredState {
    DesiredStateDocument::from_yaml_str(yaml)
        .expect("document parses")
        .load()
        .unwrap_or_else(|report| panic!("document is valid:\n{}", report.render()))
}

/// A document exercising every managed record type
pub const FULL_DOCUMENT: &str = r#"
domain: example.com
frontend:
  - { name: "@", type: A, content: 203.0.113.5, proxied: true }
  - { name: www, type: CNAME, content: example.com, proxied: true, comment: site }
  - { name: "@", type: AAAA, content: "2001:db8::5", ttl: auto }
backend:
  - { name: api, type: A, content: 203.0.113.10, proxied: false, ttl: 300 }
  - { name: "@", type: MX, content: mail.example.com, priority: 10 }
  - { name: "@", type: TXT, content: "v=spf1 include:_spf.example.com -all" }
bootstrap:
  - { name: boot, type: NS, content: ns1.example.net }
srv:
  - { name: _sip._tcp, type: SRV, priority: 10, weight: 5, port: 5060, target: sip.example.com }
"#;
