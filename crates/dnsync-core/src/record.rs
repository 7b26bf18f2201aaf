//! Record model shared by desired and live state
//!
//! A [`RecordSpec`] describes one DNS record, either as declared in the
//! desired-state document (relative name, `"@"` for the apex) or as observed
//! at the provider (fully-qualified name). Records are matched by
//! [`RecordKey`], which carries the fully-qualified name and the type but no
//! content.

use std::fmt;
use std::net::Ipv6Addr;

/// Name used in desired-state documents for the zone apex
pub const APEX: &str = "@";

/// DNS record type
///
/// The seven managed kinds are the only ones accepted in a desired-state
/// document. Live state may contain any type the provider supports; those
/// are kept as [`RecordType::Caa`] or [`RecordType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Srv,
    Ns,
    Caa,
    Other(String),
}

impl RecordType {
    /// Wire name of the type (e.g. `"AAAA"`)
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Srv => "SRV",
            RecordType::Ns => "NS",
            RecordType::Caa => "CAA",
            RecordType::Other(name) => name,
        }
    }

    /// Whether the type may appear in a desired-state document
    pub fn is_managed(&self) -> bool {
        matches!(
            self,
            RecordType::A
                | RecordType::Aaaa
                | RecordType::Cname
                | RecordType::Mx
                | RecordType::Txt
                | RecordType::Srv
                | RecordType::Ns
        )
    }

    /// Whether the provider proxy can front records of this type
    pub fn is_proxiable(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Aaaa | RecordType::Cname)
    }

    /// Types that are never deleted, even when absent from desired state
    ///
    /// Mail and verification records are frequently managed outside the
    /// desired-state document.
    pub fn is_preserved(&self) -> bool {
        matches!(self, RecordType::Mx | RecordType::Txt | RecordType::Caa)
    }

    /// Whether the content is a host name (compared without trailing dot)
    fn has_hostname_content(&self) -> bool {
        matches!(self, RecordType::Cname | RecordType::Mx | RecordType::Ns)
    }
}

impl From<&str> for RecordType {
    fn from(value: &str) -> Self {
        match value {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "SRV" => RecordType::Srv,
            "NS" => RecordType::Ns,
            "CAA" => RecordType::Caa,
            other => RecordType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record time-to-live
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Provider default
    #[default]
    Auto,
    /// Explicit TTL in seconds
    Seconds(u32),
}

impl Ttl {
    /// Value the provider API interprets as "automatic"
    pub const AUTO_WIRE_VALUE: u32 = 1;

    /// Minimum explicit TTL accepted in a desired-state document
    pub const MIN_SECONDS: u32 = 60;

    /// Numeric value sent to the provider
    pub fn as_wire(self) -> u32 {
        match self {
            Ttl::Auto => Self::AUTO_WIRE_VALUE,
            Ttl::Seconds(secs) => secs,
        }
    }

    /// Interpret a numeric TTL returned by the provider
    pub fn from_wire(value: u32) -> Self {
        if value == Self::AUTO_WIRE_VALUE {
            Ttl::Auto
        } else {
            Ttl::Seconds(value)
        }
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ttl::Auto => f.write_str("auto"),
            Ttl::Seconds(secs) => write!(f, "{}", secs),
        }
    }
}

/// Structured SRV payload, replacing `content` for SRV records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl SrvData {
    fn matches(&self, other: &SrvData) -> bool {
        self.priority == other.priority
            && self.weight == other.weight
            && self.port == other.port
            && normalize_hostname(&self.target) == normalize_hostname(&other.target)
    }
}

impl fmt::Display for SrvData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

/// Value carried by a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordValue {
    /// Flat content (IP literal, host name, text)
    Content(String),
    /// SRV structured data
    Srv(SrvData),
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Content(content) => f.write_str(content),
            RecordValue::Srv(data) => data.fmt(f),
        }
    }
}

/// One DNS record, desired or observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    /// `"@"`, a relative label, or a fully-qualified name for live records
    pub name: String,
    pub record_type: RecordType,
    pub value: RecordValue,
    pub ttl: Ttl,
    /// `None` means "provider default" (proxied, for proxiable types)
    pub proxied: Option<bool>,
    pub comment: Option<String>,
    /// MX preference
    pub priority: Option<u16>,
}

impl RecordSpec {
    /// Create a record with flat content and default settings
    pub fn new(
        name: impl Into<String>,
        record_type: RecordType,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            record_type,
            value: RecordValue::Content(content.into()),
            ttl: Ttl::Auto,
            proxied: None,
            comment: None,
            priority: None,
        }
    }

    /// Create an SRV record
    pub fn srv(name: impl Into<String>, data: SrvData) -> Self {
        Self {
            name: name.into(),
            record_type: RecordType::Srv,
            value: RecordValue::Srv(data),
            ttl: Ttl::Auto,
            proxied: None,
            comment: None,
            priority: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_proxied(mut self, proxied: bool) -> Self {
        self.proxied = Some(proxied);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Flat content, if this is not an SRV record
    pub fn content(&self) -> Option<&str> {
        match &self.value {
            RecordValue::Content(content) => Some(content),
            RecordValue::Srv(_) => None,
        }
    }

    /// Structured SRV data, if this is an SRV record
    pub fn srv_data(&self) -> Option<&SrvData> {
        match &self.value {
            RecordValue::Srv(data) => Some(data),
            RecordValue::Content(_) => None,
        }
    }

    /// Proxy setting as the provider will apply it
    ///
    /// Absent means proxied for A/AAAA/CNAME; other types are never proxied.
    pub fn effective_proxied(&self) -> bool {
        self.record_type.is_proxiable() && self.proxied.unwrap_or(true)
    }

    /// Copy of this record with its name qualified against `domain`
    pub fn qualified(&self, domain: &str) -> RecordSpec {
        RecordSpec {
            name: qualify_name(&self.name, domain),
            ..self.clone()
        }
    }

    /// Whether two records of the same key carry the same value
    ///
    /// Compares the content (or SRV data), the MX priority and the effective
    /// proxy setting. TTL and comment are not part of the comparison.
    pub fn same_value(&self, other: &RecordSpec) -> bool {
        if self.effective_proxied() != other.effective_proxied() {
            return false;
        }

        match (&self.value, &other.value) {
            (RecordValue::Srv(a), RecordValue::Srv(b)) => a.matches(b),
            (RecordValue::Content(a), RecordValue::Content(b)) => {
                content_matches(&self.record_type, a, b)
                    && (self.record_type != RecordType::Mx || self.priority == other.priority)
            }
            _ => false,
        }
    }
}

/// Fully-qualified name of a desired record: the apex domain for `"@"`,
/// `"<name>.<domain>"` otherwise
pub fn qualify_name(name: &str, domain: &str) -> String {
    if name == APEX {
        domain.to_string()
    } else {
        format!("{}.{}", name, domain)
    }
}

/// Whether a fully-qualified name belongs to `domain`
pub fn in_domain(name: &str, domain: &str) -> bool {
    let name = normalize_hostname(name);
    let domain = normalize_hostname(domain);
    name == domain || name.ends_with(&format!(".{}", domain))
}

/// Lower-case a host name and strip trailing root-label dots
pub fn normalize_hostname(name: &str) -> String {
    name.trim_end_matches('.').to_ascii_lowercase()
}

/// Strip surrounding quote characters from TXT content
pub fn strip_quotes(text: &str) -> &str {
    text.trim_matches('"')
}

/// Type-aware content comparison
pub(crate) fn content_matches(record_type: &RecordType, a: &str, b: &str) -> bool {
    match record_type {
        RecordType::Txt => strip_quotes(a) == strip_quotes(b),
        RecordType::Aaaa => match (a.parse::<Ipv6Addr>(), b.parse::<Ipv6Addr>()) {
            (Ok(a), Ok(b)) => a == b,
            _ => a == b,
        },
        t if t.has_hostname_content() => normalize_hostname(a) == normalize_hostname(b),
        _ => a == b,
    }
}

/// Identity of a record: fully-qualified name and type
///
/// Two records with the same key but different content are the same
/// resource with a different value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    name: String,
    record_type: RecordType,
}

impl RecordKey {
    /// Build a key from a fully-qualified name
    pub fn new(fqdn: &str, record_type: RecordType) -> Self {
        Self {
            name: normalize_hostname(fqdn),
            record_type,
        }
    }

    /// Key of a desired record declared relative to `domain`
    pub fn for_desired(record: &RecordSpec, domain: &str) -> Self {
        Self::new(&qualify_name(&record.name, domain), record.record_type.clone())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.record_type)
    }
}

/// A record as it exists at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveRecord {
    /// Provider-assigned record id
    pub id: String,
    /// Record with its fully-qualified name
    pub record: RecordSpec,
}

impl LiveRecord {
    pub fn new(id: impl Into<String>, record: RecordSpec) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }

    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.record.name, self.record.record_type.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_type_round_trip_names() {
        for name in ["A", "AAAA", "CNAME", "MX", "TXT", "SRV", "NS", "CAA"] {
            assert_eq!(RecordType::from(name).as_str(), name);
        }
        assert_eq!(RecordType::from("PTR"), RecordType::Other("PTR".to_string()));
        assert_eq!(RecordType::from("a"), RecordType::Other("a".to_string()));
    }

    #[test]
    fn test_managed_and_preserved_types() {
        assert!(RecordType::Ns.is_managed());
        assert!(!RecordType::Caa.is_managed());
        assert!(RecordType::Caa.is_preserved());
        assert!(RecordType::Txt.is_preserved());
        assert!(!RecordType::A.is_preserved());
    }

    #[test]
    fn test_ttl_wire_mapping() {
        assert_eq!(Ttl::Auto.as_wire(), 1);
        assert_eq!(Ttl::Seconds(300).as_wire(), 300);
        assert_eq!(Ttl::from_wire(1), Ttl::Auto);
        assert_eq!(Ttl::from_wire(3600), Ttl::Seconds(3600));
    }

    #[test]
    fn test_qualify_name() {
        assert_eq!(qualify_name("@", "example.com"), "example.com");
        assert_eq!(qualify_name("api", "example.com"), "api.example.com");
    }

    #[test]
    fn test_key_display_and_normalization() {
        let key = RecordKey::new("API.Example.com.", RecordType::A);
        assert_eq!(key.to_string(), "api.example.com:A");

        let desired = RecordSpec::new("@", RecordType::A, "203.0.113.5");
        assert_eq!(
            RecordKey::for_desired(&desired, "example.com").to_string(),
            "example.com:A"
        );
    }

    #[test]
    fn test_in_domain() {
        assert!(in_domain("example.com", "example.com"));
        assert!(in_domain("www.example.com", "example.com"));
        assert!(!in_domain("notexample.com", "example.com"));
        assert!(!in_domain("example.org", "example.com"));
    }

    #[test]
    fn test_effective_proxied_defaults() {
        assert!(RecordSpec::new("www", RecordType::A, "1.2.3.4").effective_proxied());
        assert!(!RecordSpec::new("www", RecordType::A, "1.2.3.4")
            .with_proxied(false)
            .effective_proxied());
        assert!(!RecordSpec::new("@", RecordType::Mx, "mail.example.com").effective_proxied());
    }

    #[test]
    fn test_same_value_by_type() {
        let cname = RecordSpec::new("www", RecordType::Cname, "target.example.com");
        let live = RecordSpec::new("www.example.com", RecordType::Cname, "Target.example.com.");
        assert!(cname.same_value(&live));

        let txt = RecordSpec::new("@", RecordType::Txt, "v=spf1 -all");
        let live_txt = RecordSpec::new("example.com", RecordType::Txt, "\"v=spf1 -all\"")
            .with_proxied(false);
        assert!(txt.same_value(&live_txt));

        let mx = RecordSpec::new("@", RecordType::Mx, "mail.example.com").with_priority(10);
        let live_mx = RecordSpec::new("example.com", RecordType::Mx, "mail.example.com")
            .with_priority(20);
        assert!(!mx.same_value(&live_mx));

        let a = RecordSpec::new("api", RecordType::A, "1.2.3.4");
        let live_a = RecordSpec::new("api.example.com", RecordType::A, "1.2.3.4")
            .with_proxied(false);
        assert!(!a.same_value(&live_a), "proxy setting is part of the value");
    }

    #[test]
    fn test_same_value_srv_compares_structured_fields() {
        let data = SrvData {
            priority: 10,
            weight: 5,
            port: 5060,
            target: "sip.example.com".to_string(),
        };
        let desired = RecordSpec::srv("_sip._tcp", data.clone());
        let live = RecordSpec::srv("_sip._tcp.example.com", data.clone());
        assert!(desired.same_value(&live));

        let moved = RecordSpec::srv("_sip._tcp.example.com", SrvData { port: 5061, ..data });
        assert!(!desired.same_value(&moved));
    }
}
