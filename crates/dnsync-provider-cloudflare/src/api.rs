//! Cloudflare API v4 wire types
//!
//! Every response is wrapped in the same envelope:
//!
//! ```json
//! { "success": true, "errors": [], "result": ..., "result_info": { "page": 1, "total_pages": 3 } }
//! ```

use dnsync_core::record::{LiveRecord, RecordSpec, RecordType, RecordValue, SrvData, Ttl};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    pub result: Option<T>,
    #[serde(default)]
    pub result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    /// Error messages joined for reporting
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "request unsuccessful".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct ResultInfo {
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Zone {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Created {
    pub id: String,
}

/// SRV structured payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrvPayload {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

impl From<&SrvData> for SrvPayload {
    fn from(data: &SrvData) -> Self {
        Self {
            priority: data.priority,
            weight: data.weight,
            port: data.port,
            target: data.target.clone(),
        }
    }
}

impl From<SrvPayload> for SrvData {
    fn from(payload: SrvPayload) -> Self {
        Self {
            priority: payload.priority,
            weight: payload.weight,
            port: payload.port,
            target: payload.target,
        }
    }
}

/// DNS record as returned by `GET /zones/:zone_id/dns_records`
#[derive(Debug, Deserialize)]
pub(crate) struct DnsRecord {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub proxied: Option<bool>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub priority: Option<u16>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl DnsRecord {
    /// Normalize into the shared record model
    pub fn into_live(self) -> LiveRecord {
        let record_type = RecordType::from(self.record_type.as_str());

        let value = match record_type {
            RecordType::Srv => self
                .srv_data()
                .map(RecordValue::Srv)
                .unwrap_or_else(|| RecordValue::Content(self.content.clone().unwrap_or_default())),
            _ => RecordValue::Content(self.content.clone().unwrap_or_default()),
        };

        let priority = match record_type {
            RecordType::Mx => self.priority,
            _ => None,
        };

        LiveRecord::new(
            self.id,
            RecordSpec {
                name: self.name,
                record_type,
                value,
                ttl: Ttl::from_wire(self.ttl.unwrap_or(Ttl::AUTO_WIRE_VALUE)),
                proxied: self.proxied,
                comment: self.comment,
                priority,
            },
        )
    }

    /// SRV data from the `data` object, or from `priority` plus
    /// `"<weight> <port> <target>"` content
    fn srv_data(&self) -> Option<SrvData> {
        if let Some(data) = &self.data {
            if let Ok(payload) = serde_json::from_value::<SrvPayload>(data.clone()) {
                return Some(payload.into());
            }
        }

        let content = self.content.as_deref()?;
        let mut fields = content.split_whitespace();
        let weight = fields.next()?.parse().ok()?;
        let port = fields.next()?.parse().ok()?;
        let target = fields.next()?.to_string();
        Some(SrvData {
            priority: self.priority?,
            weight,
            port,
            target,
        })
    }
}

/// Body of `POST` and `PUT /zones/:zone_id/dns_records[/:id]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordPayload {
    #[serde(rename = "type")]
    pub record_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxied: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SrvPayload>,
}

impl From<&RecordSpec> for RecordPayload {
    /// `ttl: auto` becomes `1`; SRV carries `data` instead of `content`;
    /// `proxied` is only sent for types the proxy can front.
    fn from(record: &RecordSpec) -> Self {
        let (content, data) = match &record.value {
            RecordValue::Content(content) => (Some(content.clone()), None),
            RecordValue::Srv(srv) => (None, Some(SrvPayload::from(srv))),
        };

        Self {
            record_type: record.record_type.to_string(),
            name: record.name.clone(),
            content,
            ttl: record.ttl.as_wire(),
            proxied: record
                .record_type
                .is_proxiable()
                .then(|| record.effective_proxied()),
            comment: record.comment.clone(),
            priority: match record.record_type {
                RecordType::Mx => record.priority,
                _ => None,
            },
            data,
        }
    }
}
