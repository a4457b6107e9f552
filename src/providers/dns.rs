// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! DNS provider boundary and its Cloudflare implementation.

use crate::error::{DockyardError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    #[serde(rename = "A")]
    A,
    #[serde(rename = "CNAME")]
    Cname,
    #[serde(rename = "NS")]
    Ns,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Cname => "CNAME",
            RecordType::Ns => "NS",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single record the provider should serve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub record_type: RecordType,
    pub name: String,
    pub target: String,
}

impl DnsRecord {
    pub fn new(record_type: RecordType, name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_type,
            name: name.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.record_type, self.name, self.target)
    }
}

/// Create-or-replace access to a DNS zone
#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn upsert_record(&self, record: &DnsRecord) -> Result<()>;
}

/// Cloudflare v4 API client authenticated with an API token
pub struct CloudflareDns {
    http: Client,
    base_url: String,
    api_token: String,
    domain_to_zone_id: BTreeMap<String, String>,
}

impl fmt::Debug for CloudflareDns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudflareDns")
            .field("base_url", &self.base_url)
            .field("zones", &self.domain_to_zone_id)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ExistingRecord {
    id: String,
    #[serde(default)]
    content: String,
}

#[derive(Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: RecordType,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl CloudflareDns {
    pub fn new(
        base_url: &str,
        api_token: &str,
        domain_to_zone_id: BTreeMap<String, String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            domain_to_zone_id,
        })
    }

    /// Zone serving `name`, by longest matching domain suffix
    fn zone_for(&self, name: &str) -> Option<&str> {
        let name = name.trim_end_matches('.').to_ascii_lowercase();
        self.domain_to_zone_id
            .iter()
            .filter(|(domain, _)| {
                let domain = domain.trim_end_matches('.').to_ascii_lowercase();
                name == domain || name.ends_with(&format!(".{}", domain))
            })
            .max_by_key(|(domain, _)| domain.len())
            .map(|(_, zone)| zone.as_str())
    }

    async fn find_record(&self, zone: &str, record: &DnsRecord) -> Result<Option<ExistingRecord>> {
        let response = self
            .http
            .get(format!("{}/zones/{}/dns_records", self.base_url, zone))
            .bearer_auth(&self.api_token)
            .query(&[("type", record.record_type.as_str()), ("name", record.name.as_str())])
            .send()
            .await?;

        let envelope: Envelope<Vec<ExistingRecord>> = response.json().await?;
        Ok(unwrap_envelope(envelope)?
            .unwrap_or_default()
            .into_iter()
            .next())
    }
}

fn unwrap_envelope<T>(envelope: Envelope<T>) -> Result<Option<T>> {
    if envelope.success {
        return Ok(envelope.result);
    }

    let messages: Vec<String> = envelope
        .errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect();
    Err(DockyardError::DnsProviderError(if messages.is_empty() {
        "request was not successful".to_string()
    } else {
        messages.join(", ")
    }))
}

fn same_target(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

#[async_trait]
impl DnsProvider for CloudflareDns {
    #[instrument(skip(self), fields(record = %record))]
    async fn upsert_record(&self, record: &DnsRecord) -> Result<()> {
        let zone = self.zone_for(&record.name).ok_or_else(|| {
            DockyardError::DnsProviderError(format!("no zone configured for {}", record.name))
        })?;

        let body = RecordBody {
            record_type: record.record_type,
            name: &record.name,
            content: &record.target,
            ttl: 1,
            proxied: false,
        };

        let request = match self.find_record(zone, record).await? {
            Some(existing) if same_target(&existing.content, &record.target) => {
                debug!("Record already up to date");
                return Ok(());
            }
            Some(existing) => {
                info!("Updating DNS record {}", record);
                self.http.put(format!(
                    "{}/zones/{}/dns_records/{}",
                    self.base_url, zone, existing.id
                ))
            }
            None => {
                info!("Creating DNS record {}", record);
                self.http
                    .post(format!("{}/zones/{}/dns_records", self.base_url, zone))
            }
        };

        let response = request
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<serde_json::Value> = response.json().await?;
        unwrap_envelope(envelope)?;

        Ok(())
    }
}
