//! Desired-state document loader
//!
//! The document is YAML:
//!
//! ```yaml
//! domain: example.com
//! frontend:
//!   - { name: "@", type: A, content: 203.0.113.5, proxied: true }
//! backend: []
//! bootstrap: []
//! srv:
//!   - { name: _sip._tcp, type: SRV, priority: 10, weight: 5, port: 5060, target: sip.example.com }
//! ```
//!
//! Every record field is kept as an untyped YAML value and the validator
//! reports *all* problems at once. Typed [`RecordSpec`]s are only handed out by [`DesiredStateDocument::load`],
//! after the whole document validated.

use crate::error::{Error, Result};
use crate::record::{RecordKey, RecordSpec, qualify_name};
use crate::validation::{self, ValidationReport};
use serde::Deserialize;
use serde_yaml::Value;
use std::fmt;
use std::path::Path;

/// Logical section of the desired-state document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Frontend,
    Backend,
    Bootstrap,
    Srv,
}

impl Section {
    /// All sections, in document processing order
    pub const ALL: [Section; 4] = [
        Section::Frontend,
        Section::Backend,
        Section::Bootstrap,
        Section::Srv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Frontend => "frontend",
            Section::Backend => "backend",
            Section::Bootstrap => "bootstrap",
            Section::Srv => "srv",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a record in the document, rendered as `section[index]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordLocation {
    pub section: Section,
    pub index: usize,
}

impl fmt::Display for RecordLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.section, self.index)
    }
}

/// A record entry exactly as written in the document
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default, rename = "type")]
    pub record_type: Option<Value>,
    #[serde(default)]
    pub content: Option<Value>,
    #[serde(default)]
    pub ttl: Option<Value>,
    #[serde(default)]
    pub proxied: Option<Value>,
    #[serde(default)]
    pub comment: Option<Value>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub weight: Option<Value>,
    #[serde(default)]
    pub port: Option<Value>,
    #[serde(default)]
    pub target: Option<Value>,
}

impl RawRecord {
    /// Short human label, `name (type)`, for reports
    pub fn label(&self) -> String {
        let name = self
            .name
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("unnamed");
        let record_type = self
            .record_type
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        format!("{} ({})", name, record_type)
    }
}

#[derive(Debug, Default, Deserialize)]
struct DocumentRepr {
    #[serde(default)]
    domain: Option<Value>,
    #[serde(default)]
    frontend: Option<Vec<RawRecord>>,
    #[serde(default)]
    backend: Option<Vec<RawRecord>>,
    #[serde(default)]
    bootstrap: Option<Vec<RawRecord>>,
    #[serde(default)]
    srv: Option<Vec<RawRecord>>,
}

/// Parsed, not yet validated, desired-state document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesiredStateDocument {
    domain: Option<Value>,
    frontend: Vec<RawRecord>,
    backend: Vec<RawRecord>,
    bootstrap: Vec<RawRecord>,
    srv: Vec<RawRecord>,
}

impl DesiredStateDocument {
    /// Parse a document from YAML text
    ///
    /// Fails only on malformed YAML or a section that is not a list of
    /// mappings; grammar problems are left to [`Self::validate`].
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::document("desired-state document is empty"));
        }

        let repr: DocumentRepr = serde_yaml::from_str(text)?;

        Ok(Self {
            domain: repr.domain,
            frontend: repr.frontend.unwrap_or_default(),
            backend: repr.backend.unwrap_or_default(),
            bootstrap: repr.bootstrap.unwrap_or_default(),
            srv: repr.srv.unwrap_or_default(),
        })
    }

    /// Read and parse a document from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        tracing::debug!("Loaded desired-state document from {}", path.display());
        Self::from_yaml_str(&text)
    }

    /// The raw `domain` value, if present
    pub fn domain_value(&self) -> Option<&Value> {
        self.domain.as_ref()
    }

    /// The `domain` field, if present and a string
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_ref().and_then(Value::as_str)
    }

    /// Records of one section
    pub fn section(&self, section: Section) -> &[RawRecord] {
        match section {
            Section::Frontend => &self.frontend,
            Section::Backend => &self.backend,
            Section::Bootstrap => &self.bootstrap,
            Section::Srv => &self.srv,
        }
    }

    /// All records with their location, in processing order
    pub fn records(&self) -> impl Iterator<Item = (RecordLocation, &RawRecord)> {
        Section::ALL.into_iter().flat_map(move |section| {
            self.section(section)
                .iter()
                .enumerate()
                .map(move |(index, record)| (RecordLocation { section, index }, record))
        })
    }

    /// Total number of record entries
    pub fn record_count(&self) -> usize {
        Section::ALL
            .iter()
            .map(|section| self.section(*section).len())
            .sum()
    }

    /// Check the document against the record grammar
    pub fn validate(&self) -> ValidationReport {
        validation::validate_document(self)
    }

    /// Validate and convert into typed desired state
    ///
    /// Returns the full [`ValidationReport`] if any record is invalid; no
    /// partial state is produced.
    pub fn load(&self) -> std::result::Result<DesiredState, ValidationReport> {
        let report = self.validate();
        if !report.is_valid() {
            return Err(report);
        }

        let mut failures = ValidationReport::new(self.record_count());
        let domain = self.domain().unwrap_or_default().to_string();
        let mut records = Vec::with_capacity(self.record_count());

        for (location, raw) in self.records() {
            match validation::parse_record(raw, &domain) {
                Ok(spec) => records.push(DesiredRecord { location, spec }),
                Err(errors) => failures.push_record_errors(location, raw, errors),
            }
        }

        if !failures.is_valid() {
            return Err(failures);
        }

        Ok(DesiredState { domain, records })
    }
}

/// A validated desired record and where it was declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub location: RecordLocation,
    pub spec: RecordSpec,
}

/// Validated desired state for one domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredState {
    domain: String,
    records: Vec<DesiredRecord>,
}

impl DesiredState {
    /// Build desired state from already-typed records
    ///
    /// Records are placed in the frontend section in the given order. No
    /// validation is performed; use [`DesiredStateDocument::load`] for input
    /// that comes from users.
    pub fn from_records(domain: impl Into<String>, specs: Vec<RecordSpec>) -> Self {
        let records = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| DesiredRecord {
                location: RecordLocation {
                    section: Section::Frontend,
                    index,
                },
                spec,
            })
            .collect();

        Self {
            domain: domain.into(),
            records,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn records(&self) -> &[DesiredRecord] {
        &self.records
    }

    pub fn specs(&self) -> impl Iterator<Item = &RecordSpec> {
        self.records.iter().map(|record| &record.spec)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fully-qualified name of a record declared in this state
    pub fn fqdn(&self, record: &RecordSpec) -> String {
        qualify_name(&record.name, &self.domain)
    }

    /// Matching key of a record declared in this state
    pub fn key(&self, record: &RecordSpec) -> RecordKey {
        RecordKey::for_desired(record, &self.domain)
    }
}
