// # Hickory Resolver Backend
//
// `DnsResolver` implementation backed by `hickory-resolver`. Each
// `HickoryResolver` talks to exactly one public nameserver, so that the
// propagation verifier sees every resolver's answer separately instead of
// whichever server answered first.
//
// - Plain DNS over UDP with TCP fallback, port 53
// - No caching, no hosts file, a single attempt per query
// - Lookup failures classified into NXDOMAIN, "no records of this type" and
//   everything else

use async_trait::async_trait;
use dnsync_core::config::VerifierConfig;
use dnsync_core::record::RecordType;
use dnsync_core::traits::{DnsResolver, LookupFailure};
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use hickory_resolver::proto::op::ResponseCode;
use hickory_resolver::proto::rr::{RData, RecordType as WireType};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Standard DNS port
const DNS_PORT: u16 = 53;

/// Resolver bound to a single nameserver
pub struct HickoryResolver {
    name: String,
    resolver: TokioAsyncResolver,
}

impl std::fmt::Debug for HickoryResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryResolver")
            .field("name", &self.name)
            .finish()
    }
}

impl HickoryResolver {
    /// Create a resolver that only queries `nameserver`
    pub fn new(nameserver: IpAddr, timeout: Duration) -> Self {
        let mut opts = ResolverOpts::default();
        opts.timeout = timeout;
        opts.attempts = 1;
        opts.cache_size = 0;
        opts.use_hosts_file = false;

        Self {
            name: nameserver.to_string(),
            resolver: TokioAsyncResolver::tokio(single_server_config(nameserver), opts),
        }
    }
}

/// UDP then TCP on port 53 of one nameserver, no search domain
fn single_server_config(nameserver: IpAddr) -> ResolverConfig {
    let socket_addr = SocketAddr::new(nameserver, DNS_PORT);
    let name_servers = vec![
        NameServerConfig::new(socket_addr, Protocol::Udp),
        NameServerConfig::new(socket_addr, Protocol::Tcp),
    ];
    ResolverConfig::from_parts(None, vec![], name_servers)
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn lookup(
        &self,
        name: &str,
        record_type: &RecordType,
    ) -> Result<Vec<String>, LookupFailure> {
        let wire_type = wire_type(record_type).ok_or_else(|| {
            LookupFailure::Other(format!("unsupported record type {}", record_type))
        })?;

        // Absolute name so no search domain is appended
        let query = format!("{}.", name.trim_end_matches('.'));

        let lookup = self
            .resolver
            .lookup(query.as_str(), wire_type)
            .await
            .map_err(|e| classify(&e))?;

        let answers: Vec<String> = lookup.iter().filter_map(render).collect();
        tracing::debug!(
            "{} answered {} {} with {:?}",
            self.name,
            name,
            record_type,
            answers
        );

        if answers.is_empty() {
            return Err(LookupFailure::NoRecords);
        }
        Ok(answers)
    }

    fn resolver_name(&self) -> &str {
        &self.name
    }
}

/// One resolver per configured nameserver
pub fn resolvers_from_config(config: &VerifierConfig) -> Vec<Box<dyn DnsResolver>> {
    config
        .resolvers
        .iter()
        .map(|ip| Box::new(HickoryResolver::new(*ip, config.timeout())) as Box<dyn DnsResolver>)
        .collect()
}

fn wire_type(record_type: &RecordType) -> Option<WireType> {
    match record_type {
        RecordType::A => Some(WireType::A),
        RecordType::Aaaa => Some(WireType::AAAA),
        RecordType::Cname => Some(WireType::CNAME),
        RecordType::Mx => Some(WireType::MX),
        RecordType::Txt => Some(WireType::TXT),
        RecordType::Ns => Some(WireType::NS),
        RecordType::Srv => Some(WireType::SRV),
        RecordType::Caa => Some(WireType::CAA),
        RecordType::Other(_) => None,
    }
}

/// Text form of an answer, in the format `DnsResolver` documents
///
/// Answers of another type than the one asked for (e.g. the CNAME chain
/// of an A query) are rendered too; they simply fail to match.
fn render(rdata: &RData) -> Option<String> {
    match rdata {
        RData::A(a) => Some(a.to_string()),
        RData::AAAA(aaaa) => Some(aaaa.to_string()),
        RData::CNAME(name) => Some(name.to_string()),
        RData::NS(name) => Some(name.to_string()),
        RData::MX(mx) => Some(format!("{} {}", mx.preference(), mx.exchange())),
        RData::TXT(txt) => Some(
            txt.txt_data()
                .iter()
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .collect::<String>(),
        ),
        RData::SRV(srv) => Some(format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            srv.target()
        )),
        _ => None,
    }
}

fn classify(err: &ResolveError) -> LookupFailure {
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => match *response_code {
            ResponseCode::NXDomain => LookupFailure::NameNotFound,
            ResponseCode::NoError => LookupFailure::NoRecords,
            other => LookupFailure::Other(format!("server responded {}", other)),
        },
        ResolveErrorKind::Timeout => LookupFailure::Other("timed out".to_string()),
        _ => LookupFailure::Other(err.to_string()),
    }
}
