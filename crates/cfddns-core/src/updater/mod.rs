//! Domain updater
//!
//! Points a single fully qualified name at a new address:
//!
//! 1. Split the name into record label and zone
//! 2. List the zone and pick the one `A` record whose display name is the
//!    full name
//! 3. Submit an edit replacing content and TTL, keeping id and type
//! 4. Turn an explicit provider error indicator into
//!    [`Error::ProviderRejected`]
//!
//! The updater performs no retries. The reconciliation loop retries on its
//! next tick.

use crate::domain::DomainSpec;
use crate::error::{Error, Result};
use crate::traits::{DnsProvider, ProviderRecord, RECORD_TYPE_A, RecordEdit, ResolvedAddress};
use tracing::{debug, info};

/// A record that was successfully edited
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRecord {
    /// Provider record id
    pub record_id: String,
    /// Content before the edit
    pub previous_content: String,
}

/// Applies address changes to individual domains through a [`DnsProvider`]
pub struct DomainUpdater {
    provider: Box<dyn DnsProvider>,
}

impl DomainUpdater {
    pub fn new(provider: Box<dyn DnsProvider>) -> Self {
        Self { provider }
    }

    /// Name of the underlying provider
    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Point `domain` at `address` with the given TTL
    pub async fn update(
        &self,
        domain: &DomainSpec,
        address: &ResolvedAddress,
        ttl: u32,
    ) -> Result<UpdatedRecord> {
        debug!(
            "Updating {} (label: {}, zone: {}) via {}",
            domain,
            domain.record_label(),
            domain.zone(),
            self.provider.provider_name()
        );

        let record = self.resolve_record(domain).await?;

        let edit = RecordEdit::replace_content(&record, address.as_str(), ttl);
        let response = self.provider.edit_record(&edit).await?;

        if let Some(message) = response.error {
            return Err(Error::rejected(message));
        }

        info!(
            "Updated {} -> {} (was: {}, ttl: {})",
            domain, address, record.content, ttl
        );

        Ok(UpdatedRecord {
            record_id: record.id,
            previous_content: record.content,
        })
    }

    /// Find the single `A` record named exactly like `domain`
    async fn resolve_record(&self, domain: &DomainSpec) -> Result<ProviderRecord> {
        let records = self.provider.list_records(domain.zone()).await?;

        let mut matches = records
            .into_iter()
            .filter(|r| r.record_type == RECORD_TYPE_A && r.name == domain.fqdn());

        let record = matches
            .next()
            .ok_or_else(|| Error::unknown_record(domain.fqdn()))?;

        if matches.next().is_some() {
            return Err(Error::unknown_record(format!(
                "{} (ambiguous: several A records share this name)",
                domain
            )));
        }

        debug!("Found record ID for {}: {}", domain, record.id);
        Ok(record)
    }
}
