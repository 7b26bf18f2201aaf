//! Environment-backed settings for the binary
//!
//! Variables read here:
//!
//! - `CLOUDFLARE_API_TOKEN`: API token (required for `plan` and `sync`)
//! - `CLOUDFLARE_ZONE_ID`: zone ID; when absent the zone is looked up by the
//!   document's `domain`
//! - `CLOUDFLARE_API_BASE`: API base URL override
//! - `DNSYNC_RESOLVERS`: comma-separated resolver IPs used by `verify`
//! - `DNSYNC_LOOKUP_DELAY_MS`: pause between verified records
//! - `DNSYNC_RESOLVER_TIMEOUT_SECS`: per-lookup timeout
//! - `DNSYNC_MODE`: `dry-run` forces dry-run for `sync`
//!
//! Lookups go through a closure so tests never touch the process environment.

use anyhow::{Context, Result, bail};
use dnsync_core::{ProviderConfig, SyncConfig, VerifierConfig};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::Level;

pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";
pub const ZONE_ID_ENV: &str = "CLOUDFLARE_ZONE_ID";
pub const API_BASE_ENV: &str = "CLOUDFLARE_API_BASE";
pub const RESOLVERS_ENV: &str = "DNSYNC_RESOLVERS";
pub const LOOKUP_DELAY_ENV: &str = "DNSYNC_LOOKUP_DELAY_MS";
pub const RESOLVER_TIMEOUT_ENV: &str = "DNSYNC_RESOLVER_TIMEOUT_SECS";
pub const MODE_ENV: &str = "DNSYNC_MODE";

/// Read a variable from the process environment, treating empty as unset
pub fn from_process_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Parse a log level name
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!(
            "log level '{}' is not valid. Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

/// Whether `DNSYNC_MODE` asks for dry-run
pub fn dry_run_requested<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(MODE_ENV).is_some_and(|mode| mode.eq_ignore_ascii_case("dry-run"))
}

/// Cloudflare provider settings
///
/// `domain` is the document's zone, used as the zone name when no zone ID
/// is configured.
pub fn provider_config<F>(lookup: &F, domain: &str) -> Result<ProviderConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(api_token) = lookup(API_TOKEN_ENV) else {
        bail!(
            "{} is required. Set it via: export {}=your_token",
            API_TOKEN_ENV,
            API_TOKEN_ENV
        );
    };

    let zone_id = lookup(ZONE_ID_ENV);
    let zone_name = match zone_id {
        Some(_) => None,
        None => Some(domain.to_string()),
    };

    let config = ProviderConfig::Cloudflare {
        api_token,
        zone_id,
        zone_name,
        api_base: lookup(API_BASE_ENV),
    };
    config.validate().context("invalid provider configuration")?;
    Ok(config)
}

/// Propagation verifier settings, starting from the defaults
pub fn verifier_config<F>(lookup: &F) -> Result<VerifierConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = VerifierConfig::default();

    if let Some(resolvers) = lookup(RESOLVERS_ENV) {
        config.resolvers = parse_resolvers(&resolvers)?;
    }
    if let Some(delay) = lookup(LOOKUP_DELAY_ENV) {
        config.lookup_delay_ms = delay
            .parse()
            .with_context(|| format!("{} must be a number of milliseconds", LOOKUP_DELAY_ENV))?;
    }
    if let Some(timeout) = lookup(RESOLVER_TIMEOUT_ENV) {
        config.timeout_secs = timeout
            .parse()
            .with_context(|| format!("{} must be a number of seconds", RESOLVER_TIMEOUT_ENV))?;
    }

    config.validate().context("invalid verifier configuration")?;
    Ok(config)
}

/// Comma-separated IP list
pub fn parse_resolvers(value: &str) -> Result<Vec<IpAddr>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| {
            item.parse::<IpAddr>()
                .with_context(|| format!("{} entry '{}' is not an IP address", RESOLVERS_ENV, item))
        })
        .collect()
}

/// Full configuration for commands that talk to the provider
///
/// Verifier variables are not read here; `plan` and `sync` never query
/// resolvers, so the verifier section keeps its defaults.
pub fn sync_config<F>(lookup: &F, records_file: PathBuf, domain: &str, dry_run: bool) -> Result<SyncConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = SyncConfig::new(records_file, provider_config(lookup, domain)?);
    config.dry_run = dry_run || dry_run_requested(lookup);
    config.validate()?;
    Ok(config)
}
