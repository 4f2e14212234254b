// # Cloudflare DNS Provider
//
// This crate implements `DnsProvider` over the Cloudflare v4 REST API.
//
// ## Behavior
//
// - `list_records`: zone lookup by name, then every A record of the zone,
//   following pagination
// - `edit_record`: one PUT per record, the response envelope decides success
// - HTTP timeout configured (30 seconds)
// - Specific error handling for HTTP status codes (401, 403, 429, 5xx)
// - Dry-run mode: lookups are performed, edits are only logged
//
// No retries, no backoff, no caching, no background tasks. The reconciliation
// loop retries by waiting for its next tick.
//
// ## Security
//
// - Credentials never appear in logs or `Debug` output
// - Empty credentials are rejected at construction
//
// ## API Reference
//
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=A&page=N`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use cfddns_core::config::{CloudflareCredentials, ProviderConfig};
use cfddns_core::traits::{DnsProvider, EditResponse, ProviderRecord, RECORD_TYPE_A, RecordEdit};
use cfddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Records requested per listing page (Cloudflare maximum for this endpoint)
const PAGE_SIZE: u32 = 100;

/// Cloudflare DNS provider
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all GET requests (zone lookup, record listing)
/// - Log the intended PUT payload
/// - **NOT** actually modify DNS records
pub struct CloudflareProvider {
    /// Authentication material
    /// ⚠️ NEVER log this value
    credentials: CloudflareCredentials,

    /// API root, without trailing slash
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, perform GET requests but skip PUT updates
    dry_run: bool,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("credentials", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a provider talking to the public Cloudflare API
    pub fn new(credentials: CloudflareCredentials, dry_run: bool) -> Result<Self> {
        Self::with_base_url(credentials, dry_run, CLOUDFLARE_API_BASE)
    }

    /// Create a provider talking to another API root (tests, proxies)
    pub fn with_base_url(
        credentials: CloudflareCredentials,
        dry_run: bool,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            dry_run,
        })
    }

    /// Create a provider from configuration
    ///
    /// Dry-run mode is enabled when `DDNS_MODE=dry-run`.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let ProviderConfig::Cloudflare { credentials } = config;

        let dry_run = std::env::var("DDNS_MODE")
            .unwrap_or_default()
            .eq_ignore_ascii_case("dry-run");

        if dry_run {
            tracing::warn!("Cloudflare provider running in DRY-RUN mode - no changes will be made");
        }

        Self::new(credentials.clone(), dry_run)
    }

    /// Whether edits are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            CloudflareCredentials::ApiToken { token } => request.bearer_auth(token),
            CloudflareCredentials::GlobalKey { email, key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", key),
        }
    }

    /// Send a request and decode the Cloudflare envelope
    ///
    /// Non-2xx answers carrying an error envelope become
    /// [`Error::ProviderRejected`]; other non-2xx answers are transport errors.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        action: &str,
    ) -> Result<Envelope<T>> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| Error::transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body)
                && !envelope.errors.is_empty()
            {
                return Err(Error::rejected(envelope.error_message()));
            }
            return Err(status_error(status, action, &body));
        }

        Ok(serde_json::from_str(&body)?)
    }

    /// Look up the zone id for a zone name
    ///
    /// ```http
    /// GET /zones?name=example.com
    /// ```
    async fn zone_id(&self, zone: &str) -> Result<String> {
        tracing::debug!("Looking up zone ID for {}", zone);

        let request = self
            .client
            .get(format!("{}/zones", self.base_url))
            .query(&[("name", zone)]);

        let envelope: Envelope<Vec<Zone>> = self.send(request, "Zone lookup").await?;
        if !envelope.success {
            return Err(Error::rejected(envelope.error_message()));
        }

        let found = envelope
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| Error::unknown_record(format!("zone not found: {}", zone)))?;

        tracing::debug!("Found zone ID for {}: {}", found.name, found.id);
        Ok(found.id)
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// List every A record of a zone
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&per_page=100&page=1
    /// ```
    async fn list_records(&self, zone: &str) -> Result<Vec<ProviderRecord>> {
        let zone_id = self.zone_id(zone).await?;
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);

        let mut records = Vec::new();
        let mut page = 1;

        loop {
            let request = self.client.get(&url).query(&[
                ("type", RECORD_TYPE_A.to_string()),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ]);

            let envelope: Envelope<Vec<DnsRecord>> = self.send(request, "Record listing").await?;
            if !envelope.success {
                return Err(Error::rejected(envelope.error_message()));
            }

            let total_pages = envelope
                .result_info
                .as_ref()
                .map(|info| info.total_pages)
                .unwrap_or(1);

            records.extend(
                envelope
                    .result
                    .unwrap_or_default()
                    .into_iter()
                    .map(|record| record.into_provider_record(&zone_id)),
            );

            if page >= total_pages {
                break;
            }
            page += 1;
        }

        tracing::debug!("Zone {} holds {} A records", zone, records.len());
        Ok(records)
    }

    /// Replace a record's content and TTL
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "home.example.com", "ttl": 120, "content": "1.2.3.4"}
    /// ```
    async fn edit_record(&self, edit: &RecordEdit) -> Result<EditResponse> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, edit.zone_id, edit.record_id
        );
        let payload = EditBody {
            record_type: &edit.record_type,
            name: &edit.name,
            ttl: edit.ttl,
            content: &edit.content,
        };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PUT request to {} with payload: {}",
                url,
                serde_json::to_string(&payload)?
            );
            return Ok(EditResponse::accepted());
        }

        tracing::debug!("Updating {} -> {}", edit.name, edit.content);

        let request = self.client.put(&url).json(&payload);
        match self.send::<serde_json::Value>(request, "Record update").await {
            Ok(envelope) if envelope.success => Ok(EditResponse::accepted()),
            Ok(envelope) => Ok(EditResponse::rejected(envelope.error_message())),
            Err(Error::ProviderRejected { message }) => Ok(EditResponse::rejected(message)),
            Err(e) => Err(e),
        }
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}

/// Map a non-2xx status without error envelope to a transport error
fn status_error(status: reqwest::StatusCode, action: &str, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::transport(format!(
            "Authentication failed: invalid credentials or insufficient permissions. Status: {}",
            status
        )),
        429 => Error::transport(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::transport(format!(
            "Cloudflare server error (transient): {} - {}",
            status, body
        )),
        _ => Error::transport(format!("{} failed: {} - {}", action, status, body)),
    }
}

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

impl<T> Envelope<T> {
    fn error_message(&self) -> String {
        if self.errors.is_empty() {
            return "request failed without error details".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{} (code {})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ResultInfo {
    #[serde(default = "one")]
    total_pages: u32,
}

fn one() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    ttl: u32,
}

impl DnsRecord {
    fn into_provider_record(self, zone_id: &str) -> ProviderRecord {
        ProviderRecord {
            id: self.id,
            zone_id: zone_id.to_string(),
            name: self.name,
            record_type: self.record_type,
            content: self.content,
            ttl: self.ttl,
        }
    }
}

#[derive(Debug, Serialize)]
struct EditBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    ttl: u32,
    content: &'a str,
}
