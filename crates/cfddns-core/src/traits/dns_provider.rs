// # DNS Provider Trait
//
// Defines the low-level provider API the domain updater drives: list the
// records of a zone, edit one record by id.
//
// ## Implementations
//
// - Cloudflare: `cfddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::traits::{DnsProvider, RecordEdit};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let records = provider.list_records("example.com").await?;
//     let record = &records[0];
//
//     let response = provider
//         .edit_record(&RecordEdit::replace_content(record, "1.2.3.4", 120))
//         .await?;
//     assert!(response.error.is_none());
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Record type managed by this system
pub const RECORD_TYPE_A: &str = "A";

/// A DNS record as the provider reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// The zone ID the record belongs to (provider-specific)
    pub zone_id: String,
    /// Display name, the fully qualified record name
    pub name: String,
    /// Record type ("A", "AAAA", "CNAME", ...)
    pub record_type: String,
    /// Current record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
}

/// An edit request for a single record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordEdit {
    /// Zone holding the record
    pub zone_id: String,
    /// Record being replaced
    pub record_id: String,
    /// Record type, reused from the existing record
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record name
    pub name: String,
    /// New time-to-live in seconds
    pub ttl: u32,
    /// New content
    pub content: String,
}

impl RecordEdit {
    /// Build an edit that keeps the record's identity and type but replaces
    /// its content and TTL
    pub fn replace_content(record: &ProviderRecord, content: impl Into<String>, ttl: u32) -> Self {
        Self {
            zone_id: record.zone_id.clone(),
            record_id: record.id.clone(),
            record_type: record.record_type.clone(),
            name: record.name.clone(),
            ttl,
            content: content.into(),
        }
    }
}

/// The provider's structured answer to an edit
///
/// Only the explicit error indicator matters to the updater; a response
/// without one is a success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditResponse {
    /// Error message when the provider flagged the request as failed
    pub error: Option<String>,
}

impl EditResponse {
    /// A response without error indicator
    pub fn accepted() -> Self {
        Self { error: None }
    }

    /// A response flagged as failed by the provider
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }
}

/// Trait for DNS provider implementations
///
/// Providers are isolated, stateless and single-shot:
///
/// - One logical API operation per call
/// - No retry logic or backoff (the reconciliation loop retries on its next tick)
/// - No caching between calls
/// - No background tasks
///
/// Transport failures are returned as [`Error::Transport`]. A provider that
/// answers with its own error envelope on a list request returns
/// [`Error::ProviderRejected`]; on an edit request it returns
/// `Ok(EditResponse::rejected(..))` and lets the updater classify it.
///
/// [`Error::Transport`]: crate::Error::Transport
/// [`Error::ProviderRejected`]: crate::Error::ProviderRejected
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// List every record in a zone
    ///
    /// # Parameters
    ///
    /// - `zone`: The zone name (e.g., "example.com")
    async fn list_records(&self, zone: &str) -> Result<Vec<ProviderRecord>, crate::Error>;

    /// Submit an edit for a single record
    async fn edit_record(&self, edit: &RecordEdit) -> Result<EditResponse, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
