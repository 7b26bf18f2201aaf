// # DNS Provider Trait
//
// Defines the interface to the remote authoritative DNS store.
//
// ## Implementations
//
// - Cloudflare: `dnsync-provider-cloudflare` crate
// - Tests: in-memory doubles in `dnsync-core/tests/common`
//
// ## Usage
//
// ```rust,ignore
// use dnsync_core::DnsProvider;
//
// async fn snapshot(provider: &dyn DnsProvider) -> dnsync_core::Result<()> {
//     // Read every live record of the zone (all pages)
//     let live = provider.list_records().await?;
//     println!("{} live records", live.len());
//     Ok(())
// }
// ```

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::record::{LiveRecord, RecordSpec};
use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// A provider exposes the four operations the reconciler needs: a full
/// snapshot of live state and single-record create/update/delete.
///
/// # Trust Level: Untrusted
///
/// Providers are external integrations with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses and normalize them into [`RecordSpec`]
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (a failed mutation is recorded by the reconciler;
///   callers re-run the idempotent sync)
/// - ❌ Decide whether a change is needed (owned by the reconciler)
/// - ❌ Cache live state between invocations (every run reads a fresh snapshot)
/// - ❌ Spawn tasks or threads
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Fetch every live record of the zone
    ///
    /// Implementations must follow pagination until the provider reports no
    /// more pages and return the complete list. A failure on any page fails
    /// the whole call; partial snapshots are never returned.
    ///
    /// Record names in the result are fully qualified.
    async fn list_records(&self) -> Result<Vec<LiveRecord>>;

    /// Create a record
    ///
    /// `record.name` is fully qualified. Returns the provider-assigned id.
    async fn create_record(&self, record: &RecordSpec) -> Result<String>;

    /// Replace an existing record (type, name, content, ttl, proxy, comment)
    ///
    /// `record.name` is fully qualified.
    async fn update_record(&self, record_id: &str, record: &RecordSpec) -> Result<()>;

    /// Delete a record by id
    async fn delete_record(&self, record_id: &str) -> Result<()>;

    /// Get the provider name (for logging/debugging)
    ///
    /// # Returns
    ///
    /// A static string identifying the provider (e.g., "cloudflare")
    fn provider_name(&self) -> &'static str;
}

/// Helper trait for constructing DNS providers from configuration
pub trait DnsProviderFactory: Send + Sync {
    /// Create a DnsProvider instance from configuration
    ///
    /// # Parameters
    ///
    /// - `config`: Configuration specific to this provider
    ///
    /// # Returns
    ///
    /// A boxed DnsProvider trait object
    fn create(&self, config: &ProviderConfig) -> Result<Box<dyn DnsProvider>>;
}
