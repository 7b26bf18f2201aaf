//! Record grammar and validator
//!
//! Pure, deterministic checks of a desired-state document. Validation never
//! stops at the first problem: every record in every section is checked and
//! all errors are collected into a [`ValidationReport`].

use crate::document::{DesiredStateDocument, RawRecord, RecordLocation};
use crate::record::{
    APEX, RecordKey, RecordSpec, RecordType, RecordValue, SrvData, Ttl, qualify_name,
};
use regex::Regex;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum length of a fully-qualified name (RFC 1035)
const MAX_FQDN_LEN: usize = 253;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("domain pattern is valid")
});

static HOSTNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").expect("hostname pattern is valid"));

static SRV_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^_[a-z]+\._[a-z]+$").expect("SRV name pattern is valid"));

static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[a-zA-Z0-9_]([a-zA-Z0-9_-]{0,61}[a-zA-Z0-9_])?)$")
        .expect("label pattern is valid")
});

/// A problem with a single record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Missing '{0}' field")]
    MissingField(&'static str),

    #[error("'{field}' must be {expected}")]
    WrongFieldType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid record type: {0}")]
    UnsupportedType(String),

    #[error("Invalid record name: {0}")]
    InvalidName(String),

    #[error("Fully-qualified name exceeds 253 characters: {0}")]
    NameTooLong(String),

    #[error("Invalid IPv4 address: {0}")]
    InvalidIpv4(String),

    #[error("Invalid IPv6 address: {0}")]
    InvalidIpv6(String),

    #[error("Invalid CNAME target: {0}")]
    InvalidCnameTarget(String),

    #[error("CNAME at root (@) requires the provider proxy")]
    ApexCnameRequiresProxy,

    #[error("Invalid MX priority: {0}")]
    InvalidPriority(String),

    #[error("SRV record missing '{0}'")]
    MissingSrvField(&'static str),

    #[error("Invalid SRV {field}: {value}")]
    InvalidSrvField { field: &'static str, value: String },

    #[error("Invalid SRV name format: {0}")]
    InvalidSrvName(String),

    #[error("{0} records cannot be proxied")]
    ProxyNotSupported(RecordType),

    #[error("Invalid TTL: {0} (must be >= 60 or 'auto')")]
    InvalidTtl(String),
}

/// A problem with the document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing 'domain' field in configuration")]
    MissingDomain,

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),

    #[error("{location} {label}: {error}")]
    Record {
        location: RecordLocation,
        label: String,
        error: RecordError,
    },

    #[error("{location}: Duplicate record {key} (first declared at {first})")]
    Duplicate {
        key: String,
        location: RecordLocation,
        first: RecordLocation,
    },
}

impl ValidationError {
    /// Where in the document the problem is, if it is tied to a record
    pub fn location(&self) -> Option<RecordLocation> {
        match self {
            ValidationError::Record { location, .. } | ValidationError::Duplicate { location, .. } => {
                Some(*location)
            }
            ValidationError::MissingDomain | ValidationError::InvalidDomain(_) => None,
        }
    }
}

/// Every problem found in a document
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
#[error("{} validation error(s) in {records_checked} record(s)", .errors.len())]
pub struct ValidationReport {
    errors: Vec<ValidationError>,
    records_checked: usize,
}

impl ValidationReport {
    pub fn new(records_checked: usize) -> Self {
        Self {
            errors: Vec::new(),
            records_checked,
        }
    }

    pub fn push(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub(crate) fn push_record_errors(
        &mut self,
        location: RecordLocation,
        record: &RawRecord,
        errors: Vec<RecordError>,
    ) {
        let label = record.label();
        self.errors
            .extend(errors.into_iter().map(|error| ValidationError::Record {
                location,
                label: label.clone(),
                error,
            }));
    }

    /// The document is accepted only when no error was found
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn records_checked(&self) -> usize {
        self.records_checked
    }

    /// Render the report grouped by record location
    pub fn render(&self) -> String {
        ReportDisplay(self).to_string()
    }
}

struct ReportDisplay<'a>(&'a ValidationReport);

impl fmt::Display for ReportDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "Validated {} records", report.records_checked)?;
        if report.is_valid() {
            return writeln!(f, "All DNS records are valid");
        }

        writeln!(f, "Found {} error(s):", report.errors.len())?;
        let mut current: Option<RecordLocation> = None;
        for error in &report.errors {
            match error {
                ValidationError::Record {
                    location,
                    label,
                    error,
                } => {
                    if current != Some(*location) {
                        writeln!(f, "{} {}", location, label)?;
                        current = Some(*location);
                    }
                    writeln!(f, "  - {}", error)?;
                }
                other => {
                    current = None;
                    writeln!(f, "{}", other)?;
                }
            }
        }
        Ok(())
    }
}

/// Validate one record
///
/// `domain` is the zone the record will be qualified against; it is only
/// used for the fully-qualified length check and may be empty.
pub fn validate_record(record: &RawRecord, domain: &str) -> Vec<RecordError> {
    parse_record(record, domain).err().unwrap_or_default()
}

/// Validate a whole document
pub fn validate_document(document: &DesiredStateDocument) -> ValidationReport {
    let mut report = ValidationReport::new(document.record_count());

    let domain = match document.domain_value() {
        None => {
            report.push(ValidationError::MissingDomain);
            None
        }
        Some(Value::String(domain)) if DOMAIN_RE.is_match(domain) => Some(domain.as_str()),
        Some(other) => {
            report.push(ValidationError::InvalidDomain(render(other)));
            None
        }
    };

    let mut seen: HashMap<String, RecordLocation> = HashMap::new();

    for (location, record) in document.records() {
        let errors = validate_record(record, domain.unwrap_or_default());
        if errors.is_empty() {
            tracing::debug!("Valid record {} {}", location, record.label());
        }
        report.push_record_errors(location, record, errors);

        if let Some(key) = duplicate_key(record, domain) {
            if let Some(first) = seen.get(&key) {
                report.push(ValidationError::Duplicate {
                    key,
                    location,
                    first: *first,
                });
            } else {
                seen.insert(key, location);
            }
        }
    }

    report
}

/// Identity used for duplicate detection; `None` when name or type is unusable
fn duplicate_key(record: &RawRecord, domain: Option<&str>) -> Option<String> {
    let name = record.name.as_ref()?.as_str()?;
    let record_type = record.record_type.as_ref()?.as_str()?;
    let key = match domain {
        Some(domain) => RecordKey::new(&qualify_name(name, domain), RecordType::from(record_type))
            .to_string(),
        None => format!("{}:{}", name.to_ascii_lowercase(), record_type),
    };
    Some(key)
}

/// Parse one record, collecting every grammar error
pub(crate) fn parse_record(
    record: &RawRecord,
    domain: &str,
) -> Result<RecordSpec, Vec<RecordError>> {
    let mut errors = Vec::new();

    let name = required_str(&record.name, "name", &mut errors);
    let record_type = match required_str(&record.record_type, "type", &mut errors) {
        Some(raw) => {
            let record_type = RecordType::from(raw);
            if record_type.is_managed() {
                Some(record_type)
            } else {
                errors.push(RecordError::UnsupportedType(raw.to_string()));
                None
            }
        }
        None => None,
    };

    if let Some(name) = name {
        check_name(name, record_type.as_ref(), domain, &mut errors);
    }

    let declared_proxied = record.proxied.as_ref().and_then(Value::as_bool);
    let mut priority = None;

    let value = match &record_type {
        Some(RecordType::A) => {
            required_scalar(&record.content, "content", &mut errors).and_then(|content| {
                if content.parse::<Ipv4Addr>().is_ok() {
                    Some(content)
                } else {
                    errors.push(RecordError::InvalidIpv4(content));
                    None
                }
            })
        }
        Some(RecordType::Aaaa) => {
            required_scalar(&record.content, "content", &mut errors).and_then(|content| {
                if content.parse::<Ipv6Addr>().is_ok() {
                    Some(content)
                } else {
                    errors.push(RecordError::InvalidIpv6(content));
                    None
                }
            })
        }
        Some(RecordType::Cname) => {
            let content = required_scalar(&record.content, "content", &mut errors);
            if name == Some(APEX) && declared_proxied == Some(false) {
                errors.push(RecordError::ApexCnameRequiresProxy);
            }
            content.and_then(|content| {
                if HOSTNAME_RE.is_match(&content) {
                    Some(content)
                } else {
                    errors.push(RecordError::InvalidCnameTarget(content));
                    None
                }
            })
        }
        Some(RecordType::Mx) => {
            priority = match &record.priority {
                None => {
                    errors.push(RecordError::MissingField("priority"));
                    None
                }
                Some(value) => {
                    let parsed = as_u16(value);
                    if parsed.is_none() {
                        errors.push(RecordError::InvalidPriority(render(value)));
                    }
                    parsed
                }
            };
            required_scalar(&record.content, "content", &mut errors)
        }
        Some(RecordType::Txt) | Some(RecordType::Ns) => {
            required_scalar(&record.content, "content", &mut errors)
        }
        _ => None,
    }
    .map(RecordValue::Content);

    let value = if record_type == Some(RecordType::Srv) {
        parse_srv(record, &mut errors).map(RecordValue::Srv)
    } else {
        value
    };

    let proxied = match &record.proxied {
        None => None,
        Some(Value::Bool(proxied)) => Some(*proxied),
        Some(_) => {
            errors.push(RecordError::WrongFieldType {
                field: "proxied",
                expected: "a boolean",
            });
            None
        }
    };
    if let (Some(true), Some(record_type)) = (proxied, &record_type) {
        if !record_type.is_proxiable() {
            errors.push(RecordError::ProxyNotSupported(record_type.clone()));
        }
    }

    let ttl = parse_ttl(&record.ttl, &mut errors);
    let comment = optional_str(&record.comment, "comment", &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    match (name, record_type, value) {
        (Some(name), Some(record_type), Some(value)) => Ok(RecordSpec {
            name: name.to_string(),
            record_type,
            value,
            ttl,
            proxied,
            comment,
            priority,
        }),
        _ => Err(errors),
    }
}

fn check_name(
    name: &str,
    record_type: Option<&RecordType>,
    domain: &str,
    errors: &mut Vec<RecordError>,
) {
    if record_type == Some(&RecordType::Srv) {
        if !SRV_NAME_RE.is_match(name) {
            errors.push(RecordError::InvalidSrvName(name.to_string()));
        }
    } else if name != APEX && (name.is_empty() || !name.split('.').all(|l| LABEL_RE.is_match(l)))
    {
        errors.push(RecordError::InvalidName(name.to_string()));
        return;
    }

    if !domain.is_empty() {
        let fqdn = qualify_name(name, domain);
        if fqdn.len() > MAX_FQDN_LEN {
            errors.push(RecordError::NameTooLong(fqdn));
        }
    }
}

fn parse_srv(record: &RawRecord, errors: &mut Vec<RecordError>) -> Option<SrvData> {
    let mut srv_field = |value: &Option<Value>, field: &'static str| match value {
        None => {
            errors.push(RecordError::MissingSrvField(field));
            None
        }
        Some(value) => {
            let parsed = as_u16(value);
            if parsed.is_none() {
                errors.push(RecordError::InvalidSrvField {
                    field,
                    value: render(value),
                });
            }
            parsed
        }
    };

    let priority = srv_field(&record.priority, "priority");
    let weight = srv_field(&record.weight, "weight");
    let port = srv_field(&record.port, "port");

    let target = match &record.target {
        None => {
            errors.push(RecordError::MissingSrvField("target"));
            None
        }
        Some(value) => match scalar(value) {
            Some(target) if HOSTNAME_RE.is_match(&target) => Some(target),
            _ => {
                errors.push(RecordError::InvalidSrvField {
                    field: "target",
                    value: render(value),
                });
                None
            }
        },
    };

    Some(SrvData {
        priority: priority?,
        weight: weight?,
        port: port?,
        target: target?,
    })
}

fn parse_ttl(value: &Option<Value>, errors: &mut Vec<RecordError>) -> Ttl {
    match value {
        None => Ttl::Auto,
        Some(Value::String(s)) if s == "auto" => Ttl::Auto,
        Some(value) => match value.as_u64().and_then(|secs| u32::try_from(secs).ok()) {
            Some(secs) if secs >= Ttl::MIN_SECONDS => Ttl::Seconds(secs),
            _ => {
                errors.push(RecordError::InvalidTtl(render(value)));
                Ttl::Auto
            }
        },
    }
}

fn required_str<'a>(
    value: &'a Option<Value>,
    field: &'static str,
    errors: &mut Vec<RecordError>,
) -> Option<&'a str> {
    match value {
        None => {
            errors.push(RecordError::MissingField(field));
            None
        }
        Some(Value::String(s)) => Some(s),
        Some(_) => {
            errors.push(RecordError::WrongFieldType {
                field,
                expected: "a string",
            });
            None
        }
    }
}

fn required_scalar(
    value: &Option<Value>,
    field: &'static str,
    errors: &mut Vec<RecordError>,
) -> Option<String> {
    match value {
        None => {
            errors.push(RecordError::MissingField(field));
            None
        }
        Some(value) => {
            let content = scalar(value);
            if content.is_none() {
                errors.push(RecordError::WrongFieldType {
                    field,
                    expected: "a string",
                });
            }
            content
        }
    }
}

fn optional_str(
    value: &Option<Value>,
    field: &'static str,
    errors: &mut Vec<RecordError>,
) -> Option<String> {
    match value {
        None => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            errors.push(RecordError::WrongFieldType {
                field,
                expected: "a string",
            });
            None
        }
    }
}

/// Strings and numbers are accepted where text is expected (unquoted TXT
/// tokens are common)
fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u16(value: &Value) -> Option<u16> {
    value.as_u64().and_then(|n| u16::try_from(n).ok())
}

fn render(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| format!("{:?}", other)),
    }
}
