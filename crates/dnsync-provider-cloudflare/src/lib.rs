// # Cloudflare DNS Provider
//
// This crate provides the Cloudflare API v4 implementation of `DnsProvider`
// for dnsync.
//
// ## Capabilities
//
// - ✅ Paginated snapshot of every record in the zone (`per_page=100`)
// - ✅ Create (POST), full replace (PUT) and delete (DELETE) by record id
// - ✅ SRV records through the structured `data` payload
// - ✅ HTTP timeout configured (30 seconds)
// - ✅ Specific error handling for HTTP status codes (401/403, 404, 409, 429, 5xx)
// - ✅ Dry-run mode for safe testing
// - ✅ Explicit zone ID or zone lookup by name
// - ❌ NO retry logic (a re-run of the idempotent sync is the retry)
// - ❌ NO diffing (owned by the reconciler)
// - ❌ NO caching of records between calls
//
// ## Security Requirements
//
// - API token NEVER appears in logs or `Debug` output
// - API token MUST be provided via environment variables only
// - Provider MUST fail fast if token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?page=N&per_page=100`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Overwrite DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`
// - List Zones: GET `/zones?name=...`

mod api;

pub use api::{RecordPayload, SrvPayload};

use api::{Created, DnsRecord, Envelope, Zone};
use async_trait::async_trait;
use dnsync_core::config::ProviderConfig;
use dnsync_core::record::{LiveRecord, RecordSpec};
use dnsync_core::traits::{DnsProvider, DnsProviderFactory};
use dnsync_core::{Error, Result};
use serde::de::DeserializeOwned;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per page when listing a zone
pub const PAGE_SIZE: u32 = 100;

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended POST/PUT/DELETE request
/// - **NOT** modify any DNS record
pub struct CloudflareProvider {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// Explicit zone ID
    zone_id: Option<String>,

    /// Zone name looked up when no zone ID is configured
    zone_name: Option<String>,

    /// Zone ID once known
    resolved_zone: OnceCell<String>,

    api_base: String,

    client: reqwest::Client,

    dry_run: bool,

    /// Sequence for ids handed out in dry-run mode
    dry_run_ids: AtomicUsize,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("zone_name", &self.zone_name)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    /// - `zone_id`: Zone ID; if absent, `zone_name` is looked up on first use
    /// - `zone_name`: Zone apex domain (e.g. `example.com`)
    /// - `dry_run`: If true, perform GET requests but skip mutations
    ///
    /// # Errors
    ///
    /// - Empty token, or neither zone ID nor zone name
    /// - HTTP client construction failure
    pub fn new(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        zone_name: Option<String>,
        dry_run: bool,
    ) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let zone_id = zone_id.filter(|id| !id.is_empty());
        let zone_name = zone_name.filter(|name| !name.is_empty());
        if zone_id.is_none() && zone_name.is_none() {
            return Err(Error::config("Cloudflare zone ID or zone name is required"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            zone_id,
            zone_name,
            resolved_zone: OnceCell::new(),
            api_base: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run,
            dry_run_ids: AtomicUsize::new(0),
        })
    }

    /// Create a provider in live mode
    pub fn new_live(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        zone_name: Option<String>,
    ) -> Result<Self> {
        Self::new(api_token, zone_id, zone_name, false)
    }

    /// Create a provider in dry-run mode
    pub fn new_dry_run(
        api_token: impl Into<String>,
        zone_id: Option<String>,
        zone_name: Option<String>,
    ) -> Result<Self> {
        Self::new(api_token, zone_id, zone_name, true)
    }

    /// Point the provider at another API endpoint (tests, proxies)
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Get the zone ID
    ///
    /// Returns the configured zone ID, or looks the zone up by name once and
    /// keeps the answer for the lifetime of the provider.
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// Authorization: Bearer <token>
    /// ```
    async fn zone_id(&self) -> Result<&str> {
        if let Some(zone_id) = &self.zone_id {
            return Ok(zone_id.as_str());
        }

        let zone_id = self
            .resolved_zone
            .get_or_try_init(|| async {
                let zone_name = self
                    .zone_name
                    .as_deref()
                    .ok_or_else(|| Error::config("Cloudflare zone name is required"))?;

                tracing::debug!("Looking up zone ID for {}", zone_name);

                let response = self
                    .client
                    .get(format!("{}/zones", self.api_base))
                    .bearer_auth(&self.api_token)
                    .query(&[("name", zone_name)])
                    .send()
                    .await
                    .map_err(request_failed)?;

                let envelope: Envelope<Vec<Zone>> =
                    parse_envelope(response, &format!("zone {}", zone_name)).await?;

                let zone = envelope
                    .result
                    .unwrap_or_default()
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::not_found(format!("Zone not found: {}", zone_name)))?;

                tracing::debug!("Found zone ID for {}", zone_name);
                Ok::<_, Error>(zone.id)
            })
            .await?;

        Ok(zone_id.as_str())
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, zone_id)
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/{}", self.records_url(zone_id), record_id)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every record in the zone
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?page=1&per_page=100
    /// ```
    ///
    /// Pages are requested until `result_info.total_pages` is reached. Any
    /// failed page fails the whole call.
    async fn list_records(&self) -> Result<Vec<LiveRecord>> {
        let zone_id = self.zone_id().await?;
        let url = self.records_url(zone_id);

        let mut records = Vec::new();
        let mut page: u32 = 1;

        loop {
            let response = self
                .client
                .get(&url)
                .bearer_auth(&self.api_token)
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .send()
                .await
                .map_err(request_failed)?;

            let envelope: Envelope<Vec<DnsRecord>> =
                parse_envelope(response, &format!("DNS records page {}", page)).await?;

            let total_pages = envelope
                .result_info
                .map(|info| info.total_pages)
                .unwrap_or(1);
            let batch = envelope.result.unwrap_or_default();

            tracing::debug!(
                "Fetched page {}/{} ({} records)",
                page,
                total_pages,
                batch.len()
            );
            records.extend(batch.into_iter().map(DnsRecord::into_live));

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        Ok(records)
    }

    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// ```
    async fn create_record(&self, record: &RecordSpec) -> Result<String> {
        let zone_id = self.zone_id().await?;
        let url = self.records_url(zone_id);
        let payload = RecordPayload::from(record);

        if self.dry_run {
            let id = format!(
                "dry-run-{}",
                self.dry_run_ids.fetch_add(1, Ordering::SeqCst)
            );
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(id);
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(request_failed)?;

        let envelope: Envelope<Created> =
            parse_envelope(response, &format!("record {}", record.name)).await?;

        envelope
            .result
            .map(|created| created.id)
            .ok_or_else(|| Error::provider("cloudflare", "Invalid response format: missing result"))
    }

    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn update_record(&self, record_id: &str, record: &RecordSpec) -> Result<()> {
        let zone_id = self.zone_id().await?;
        let url = self.record_url(zone_id, record_id);
        let payload = RecordPayload::from(record);

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(request_failed)?;

        parse_envelope::<serde_json::Value>(response, &format!("record {}", record.name)).await?;
        Ok(())
    }

    /// ```http
    /// DELETE /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn delete_record(&self, record_id: &str) -> Result<()> {
        let zone_id = self.zone_id().await?;
        let url = self.record_url(zone_id, record_id);

        if self.dry_run {
            tracing::info!("[DRY-RUN] Would send DELETE request to {}", url);
            return Ok(());
        }

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(request_failed)?;

        parse_envelope::<serde_json::Value>(response, &format!("record {}", record_id)).await?;
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

fn request_failed(err: reqwest::Error) -> Error {
    Error::provider("cloudflare", format!("HTTP request failed: {}", err))
}

/// Map a non-success HTTP status to an error
///
/// `subject` names what the request was about, for 404 messages.
fn status_error(status: reqwest::StatusCode, body: &str, subject: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid API token or insufficient permissions. Status: {}",
            status
        )),
        404 => Error::not_found(format!("{} ({})", subject, status)),
        409 => Error::provider(
            "cloudflare",
            format!("Conflict: {} was changed concurrently. Status: {}", subject, status),
        ),
        429 => Error::rate_limited(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::provider(
            "cloudflare",
            format!("Cloudflare server error (transient): {} - {}", status, body),
        ),
        _ => Error::provider(
            "cloudflare",
            format!("Request for {} failed: {} - {}", subject, status, body),
        ),
    }
}

/// Check status and `success`, then decode the envelope
async fn parse_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
    subject: &str,
) -> Result<Envelope<T>> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());
        return Err(status_error(status, &body, subject));
    }

    let envelope: Envelope<T> = response.json().await.map_err(|e| {
        Error::provider("cloudflare", format!("Failed to parse response: {}", e))
    })?;

    if !envelope.success {
        return Err(Error::provider(
            "cloudflare",
            format!("Request for {} failed: {}", subject, envelope.error_summary()),
        ));
    }

    Ok(envelope)
}

/// Factory for creating Cloudflare providers
///
/// Dry-run mode is fixed when the factory is built; use
/// [`register_dry_run`] to get providers that never mutate the zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct CloudflareFactory {
    dry_run: bool,
}

impl CloudflareFactory {
    /// Factory whose providers never mutate the zone
    pub fn dry_run() -> Self {
        Self { dry_run: true }
    }
}

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>> {
        match config {
            ProviderConfig::Cloudflare {
                api_token,
                zone_id,
                zone_name,
                api_base,
            } => {
                if api_token.is_empty() {
                    return Err(Error::config("Cloudflare API token is required"));
                }

                let dry_run = self.dry_run;
                if dry_run {
                    tracing::warn!(
                        "Cloudflare provider running in DRY-RUN mode - no changes will be made"
                    );
                }

                let mut provider =
                    CloudflareProvider::new(api_token.clone(), zone_id.clone(), zone_name.clone(), dry_run)?;
                if let Some(api_base) = api_base {
                    provider = provider.with_api_base(api_base.clone());
                }
                Ok(Box::new(provider))
            }
            _ => Err(Error::config("Invalid config for Cloudflare provider")),
        }
    }
}

/// Register the Cloudflare provider with a registry
///
/// # Example
///
/// ```rust
/// use dnsync_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// dnsync_provider_cloudflare::register(&registry);
/// assert!(registry.has_provider("cloudflare"));
/// ```
pub fn register(registry: &dnsync_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory::default()));
}

/// Register a Cloudflare factory that always runs in dry-run mode
pub fn register_dry_run(registry: &dnsync_core::ProviderRegistry) {
    registry.register_provider("cloudflare", Box::new(CloudflareFactory::dry_run()));
}
