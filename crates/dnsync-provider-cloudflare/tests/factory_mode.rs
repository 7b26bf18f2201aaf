//! Provider mode comes from the factory, never from the process environment
//!
//! Kept in its own test binary because it sets an environment variable.

use dnsync_core::DnsProviderFactory;
use dnsync_core::config::ProviderConfig;
use dnsync_core::record::{RecordSpec, RecordType};
use dnsync_provider_cloudflare::CloudflareFactory;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn live_factory_mutates_even_when_mode_says_dry_run() {
    // SAFETY: this is the only test in the binary and nothing else runs yet
    unsafe { std::env::set_var("DNSYNC_MODE", "dry-run") };

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/zones/zone-123/dns_records"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "errors": [],
            "result": { "id": "rec-new" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig::Cloudflare {
        api_token: "test-token".to_string(),
        zone_id: Some("zone-123".to_string()),
        zone_name: None,
        api_base: Some(server.uri()),
    };
    let provider = CloudflareFactory::default().create(&config).unwrap();
    let record = RecordSpec::new("api.example.com", RecordType::A, "1.2.3.4");

    assert_eq!(provider.create_record(&record).await.unwrap(), "rec-new");
}
