//! Configuration types for the dnsync system
//!
//! A single [`SyncConfig`] is threaded explicitly through every entry point.
//! Credentials and zone identifiers are never compiled in; the binary fills
//! them from the environment.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum number of independent resolvers used for verification
pub const MIN_RESOLVERS: usize = 3;

/// Default location of the desired-state document
pub const DEFAULT_RECORDS_FILE: &str = "dns/records.yaml";

/// Main dnsync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path of the desired-state document
    #[serde(default = "default_records_file")]
    pub records_file: PathBuf,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Propagation verifier settings
    #[serde(default)]
    pub verifier: VerifierConfig,

    /// Compute and log changes without mutating the provider
    #[serde(default)]
    pub dry_run: bool,
}

impl SyncConfig {
    /// Create a new configuration with default verifier settings
    pub fn new(records_file: impl Into<PathBuf>, provider: ProviderConfig) -> Self {
        Self {
            records_file: records_file.into(),
            provider,
            verifier: VerifierConfig::default(),
            dry_run: false,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.records_file.as_os_str().is_empty() {
            return Err(crate::Error::config("Records file path cannot be empty"));
        }

        self.provider.validate()?;
        self.verifier.validate()?;

        Ok(())
    }
}

/// DNS provider configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Cloudflare API token
        api_token: String,
        /// Zone ID (optional if `zone_name` is set)
        #[serde(default)]
        zone_id: Option<String>,
        /// Zone name used to look the zone ID up when `zone_id` is absent
        #[serde(default)]
        zone_name: Option<String>,
        /// API base URL override
        #[serde(default)]
        api_base: Option<String>,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                zone_name,
                ..
            } => {
                if api_token.is_empty() {
                    return Err(crate::Error::config("Cloudflare API token cannot be empty"));
                }
                let has_zone_id = zone_id.as_ref().is_some_and(|id| !id.is_empty());
                let has_zone_name = zone_name.as_ref().is_some_and(|name| !name.is_empty());
                if !has_zone_id && !has_zone_name {
                    return Err(crate::Error::config(
                        "Cloudflare zone ID or zone name is required",
                    ));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Cloudflare { .. } => "cloudflare",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }
}

// Custom Debug implementation that hides the API token
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderConfig::Cloudflare {
                zone_id,
                zone_name,
                api_base,
                ..
            } => f
                .debug_struct("Cloudflare")
                .field("api_token", &"<REDACTED>")
                .field("zone_id", zone_id)
                .field("zone_name", zone_name)
                .field("api_base", api_base)
                .finish(),
            ProviderConfig::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

/// Propagation verifier configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Independent resolvers to query (at least [`MIN_RESOLVERS`])
    #[serde(default = "default_resolvers")]
    pub resolvers: Vec<IpAddr>,

    /// Pause between consecutive lookups, in milliseconds
    #[serde(default = "default_lookup_delay_ms")]
    pub lookup_delay_ms: u64,

    /// Per-lookup timeout, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl VerifierConfig {
    /// Validate the verifier configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        let mut distinct = self.resolvers.clone();
        distinct.sort();
        distinct.dedup();
        if distinct.len() < MIN_RESOLVERS {
            return Err(crate::Error::config(format!(
                "At least {} distinct resolvers are required, got {}",
                MIN_RESOLVERS,
                distinct.len()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Resolver timeout must be > 0"));
        }
        Ok(())
    }

    pub fn lookup_delay(&self) -> Duration {
        Duration::from_millis(self.lookup_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            resolvers: default_resolvers(),
            lookup_delay_ms: default_lookup_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_records_file() -> PathBuf {
    PathBuf::from(DEFAULT_RECORDS_FILE)
}

/// Cloudflare, Google and Quad9 public resolvers
fn default_resolvers() -> Vec<IpAddr> {
    vec![
        IpAddr::from([1, 1, 1, 1]),
        IpAddr::from([8, 8, 8, 8]),
        IpAddr::from([9, 9, 9, 9]),
    ]
}

fn default_lookup_delay_ms() -> u64 {
    500
}

fn default_timeout_secs() -> u64 {
    5
}
