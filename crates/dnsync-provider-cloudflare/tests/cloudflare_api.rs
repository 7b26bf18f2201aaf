//! Cloudflare API contract tests against a mock server
//!
//! Constraints verified:
//! - Every page of the zone is read, following `result_info.total_pages`
//! - A failed page fails the whole listing
//! - Mutations use the documented verbs, paths and payload shape
//! - HTTP status codes map to the matching error kinds
//! - Dry-run mode never sends a mutation

use dnsync_core::record::{RecordSpec, RecordType, SrvData, Ttl};
use dnsync_core::{DnsProvider, Error};
use dnsync_provider_cloudflare::CloudflareProvider;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str = "zone-123";
const TOKEN: &str = "test-token";

fn provider(server: &MockServer) -> CloudflareProvider {
    CloudflareProvider::new_live(TOKEN, Some(ZONE.to_string()), None)
        .unwrap()
        .with_api_base(server.uri())
}

fn page(records: Value, page: u32, total_pages: u32) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "success": true,
        "errors": [],
        "result": records,
        "result_info": { "page": page, "per_page": 100, "total_pages": total_pages }
    }))
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "success": true, "errors": [], "result": result }))
}

fn a_record(id: &str, name: &str, content: &str) -> Value {
    json!({ "id": id, "name": name, "type": "A", "content": content, "ttl": 1, "proxied": true })
}

#[tokio::test]
async fn list_follows_all_pages() {
    let server = MockServer::start().await;
    let records_path = format!("/zones/{}/dns_records", ZONE);

    Mock::given(method("GET"))
        .and(path(records_path.as_str()))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "100"))
        .and(header("authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(page(
            json!([a_record("r1", "example.com", "203.0.113.5")]),
            1,
            2,
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(records_path.as_str()))
        .and(query_param("page", "2"))
        .respond_with(page(
            json!([
                a_record("r2", "api.example.com", "203.0.113.10"),
                {
                    "id": "r3", "name": "example.com", "type": "MX",
                    "content": "mail.example.com", "priority": 10, "ttl": 3600, "proxied": false
                }
            ]),
            2,
            2,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let records = provider(&server).list_records().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(records[0].key().to_string(), "example.com:A");
    assert_eq!(records[0].record.ttl, Ttl::Auto);
    assert_eq!(records[2].record.priority, Some(10));
    assert_eq!(records[2].record.ttl, Ttl::Seconds(3600));
}

#[tokio::test]
async fn failed_page_fails_listing() {
    let server = MockServer::start().await;
    let records_path = format!("/zones/{}/dns_records", ZONE);

    Mock::given(method("GET"))
        .and(path(records_path.as_str()))
        .and(query_param("page", "1"))
        .respond_with(page(json!([a_record("r1", "example.com", "203.0.113.5")]), 1, 2))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(records_path.as_str()))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = provider(&server).list_records().await.unwrap_err();
    assert!(err.to_string().contains("transient"), "{}", err);
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "errors": [{ "code": 7003, "message": "Could not route to /zones/zone-123" }],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server).list_records().await.unwrap_err();
    assert!(err.to_string().contains("7003"), "{}", err);
}

#[tokio::test]
async fn create_posts_full_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{}/dns_records", ZONE).as_str()))
        .and(body_json(json!({
            "type": "A",
            "name": "example.com",
            "content": "203.0.113.5",
            "ttl": 1,
            "proxied": true
        })))
        .respond_with(ok(a_record("new-1", "example.com", "203.0.113.5")))
        .expect(1)
        .mount(&server)
        .await;

    let record = RecordSpec::new("example.com", RecordType::A, "203.0.113.5");
    let id = provider(&server).create_record(&record).await.unwrap();

    assert_eq!(id, "new-1");
}

#[tokio::test]
async fn update_puts_srv_data() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}/dns_records/rec-9", ZONE).as_str()))
        .and(body_json(json!({
            "type": "SRV",
            "name": "_sip._tcp.example.com",
            "ttl": 300,
            "data": { "priority": 10, "weight": 5, "port": 5060, "target": "sip.example.com" }
        })))
        .respond_with(ok(json!({ "id": "rec-9" })))
        .expect(1)
        .mount(&server)
        .await;

    let record = RecordSpec::srv(
        "_sip._tcp.example.com",
        SrvData {
            priority: 10,
            weight: 5,
            port: 5060,
            target: "sip.example.com".to_string(),
        },
    )
    .with_ttl(Ttl::Seconds(300));

    provider(&server).update_record("rec-9", &record).await.unwrap();
}

#[tokio::test]
async fn delete_by_id() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{}/dns_records/rec-1", ZONE).as_str()))
        .respond_with(ok(json!({ "id": "rec-1" })))
        .expect(1)
        .mount(&server)
        .await;

    provider(&server).delete_record("rec-1").await.unwrap();
}

#[tokio::test]
async fn status_codes_map_to_error_kinds() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{}/dns_records/forbidden", ZONE).as_str()))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{}/dns_records/missing", ZONE).as_str()))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/zones/{}/dns_records/busy", ZONE).as_str()))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let provider = provider(&server);

    assert!(matches!(
        provider.delete_record("forbidden").await,
        Err(Error::Authentication(_))
    ));
    assert!(matches!(
        provider.delete_record("missing").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        provider.delete_record("busy").await,
        Err(Error::RateLimited(_))
    ));
}

#[tokio::test]
async fn zone_is_looked_up_by_name_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/zones"))
        .and(query_param("name", "example.com"))
        .respond_with(ok(json!([{ "id": ZONE, "name": "example.com" }])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE).as_str()))
        .respond_with(page(json!([]), 1, 1))
        .expect(2)
        .mount(&server)
        .await;

    let provider = CloudflareProvider::new_live(TOKEN, None, Some("example.com".to_string()))
        .unwrap()
        .with_api_base(server.uri());

    assert!(provider.list_records().await.unwrap().is_empty());
    assert!(provider.list_records().await.unwrap().is_empty());
}

#[tokio::test]
async fn dry_run_sends_no_mutation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let provider = CloudflareProvider::new_dry_run(TOKEN, Some(ZONE.to_string()), None)
        .unwrap()
        .with_api_base(server.uri());
    let record = RecordSpec::new("api.example.com", RecordType::A, "1.2.3.4");

    assert!(provider.create_record(&record).await.unwrap().starts_with("dry-run-"));
    provider.update_record("rec-1", &record).await.unwrap();
    provider.delete_record("rec-1").await.unwrap();
}
