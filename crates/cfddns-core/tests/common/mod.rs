//! Test doubles and common utilities for reconciliation contract tests
//!
//! This module provides minimal test doubles that count calls so that the
//! tests can assert on provider traffic and report delivery.

#![allow(dead_code)]

use async_trait::async_trait;
use cfddns_core::config::{CloudflareCredentials, DdnsConfig, ProviderConfig};
use cfddns_core::error::{Error, Result};
use cfddns_core::report::CycleReport;
use cfddns_core::traits::{
    AddressResolver, DnsProvider, EditResponse, ProviderRecord, RecordEdit, ReportSink,
    ResolvedAddress,
};
use cfddns_core::{DomainUpdater, ReconciliationLoop};
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// A resolver that replays a scripted sequence of answers
///
/// Once the script is exhausted the last answer repeats.
pub struct ScriptedResolver {
    script: Mutex<VecDeque<Result<String>>>,
    last: Mutex<Option<Result<String>>>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl ScriptedResolver {
    pub fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Resolver that returns successful addresses in order
    pub fn addresses(addresses: &[&str]) -> Self {
        Self::new(addresses.iter().map(|a| Ok(a.to_string())).collect())
    }

    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedResolver sharing the call counter with `other`
    pub fn sharing_counters_with(other: &Self, script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            resolve_call_count: Arc::clone(&other.resolve_call_count),
        }
    }
}

#[async_trait]
impl AddressResolver for ScriptedResolver {
    async fn resolve(&self) -> Result<ResolvedAddress> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap().pop_front();
        let answer = match next {
            Some(answer) => {
                *self.last.lock().unwrap() = Some(answer.clone());
                answer
            }
            None => self
                .last
                .lock()
                .unwrap()
                .clone()
                .unwrap_or_else(|| Err(Error::transport("script exhausted"))),
        };

        answer.and_then(|raw| {
            ResolvedAddress::new(raw).ok_or_else(|| Error::transport("empty response"))
        })
    }

    fn resolver_name(&self) -> &'static str {
        "scripted"
    }
}

/// A mock DnsProvider that serves a zone listing and tracks calls
#[derive(Clone)]
pub struct MockDnsProvider {
    /// Records served by list_records(); zone_id doubles as zone name
    records: Arc<Mutex<Vec<ProviderRecord>>>,
    /// Names whose edits are answered with an error envelope
    rejected_names: Arc<Mutex<HashSet<String>>>,
    /// Smallest TTL accepted on edits
    min_ttl: Arc<AtomicU32>,
    /// Call counter for list_records()
    list_call_count: Arc<AtomicUsize>,
    /// Call counter for edit_record()
    edit_call_count: Arc<AtomicUsize>,
    /// Edits received, in order
    edits: Arc<Mutex<Vec<RecordEdit>>>,
}

impl MockDnsProvider {
    /// Provider holding exactly one A record per given name
    pub fn with_domains(names: &[&str]) -> Self {
        let records = names.iter().map(|name| a_record(name)).collect();
        Self::with_records(records)
    }

    pub fn with_records(records: Vec<ProviderRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            rejected_names: Arc::new(Mutex::new(HashSet::new())),
            min_ttl: Arc::new(AtomicU32::new(0)),
            list_call_count: Arc::new(AtomicUsize::new(0)),
            edit_call_count: Arc::new(AtomicUsize::new(0)),
            edits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Answer edits of `name` with a provider error
    pub fn reject(&self, name: &str) {
        self.rejected_names.lock().unwrap().insert(name.to_string());
    }

    /// Refuse edits carrying a TTL below `ttl`
    pub fn require_min_ttl(&self, ttl: u32) {
        self.min_ttl.store(ttl, Ordering::SeqCst);
    }

    /// Accept edits of `name` again
    pub fn accept(&self, name: &str) {
        self.rejected_names.lock().unwrap().remove(name);
    }

    pub fn list_call_count(&self) -> usize {
        self.list_call_count.load(Ordering::SeqCst)
    }

    pub fn edit_call_count(&self) -> usize {
        self.edit_call_count.load(Ordering::SeqCst)
    }

    /// Total provider traffic
    pub fn call_count(&self) -> usize {
        self.list_call_count() + self.edit_call_count()
    }

    /// Names of edited records, in order
    pub fn edited_names(&self) -> Vec<String> {
        self.edits
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn edits(&self) -> Vec<RecordEdit> {
        self.edits.lock().unwrap().clone()
    }
}

#[async_trait]
impl DnsProvider for MockDnsProvider {
    async fn list_records(&self, zone: &str) -> Result<Vec<ProviderRecord>> {
        self.list_call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.zone_id == zone)
            .cloned()
            .collect())
    }

    async fn edit_record(&self, edit: &RecordEdit) -> Result<EditResponse> {
        self.edit_call_count.fetch_add(1, Ordering::SeqCst);
        self.edits.lock().unwrap().push(edit.clone());

        if self.rejected_names.lock().unwrap().contains(&edit.name) {
            return Ok(EditResponse::rejected(format!("edit of {} refused", edit.name)));
        }
        let min_ttl = self.min_ttl.load(Ordering::SeqCst);
        if edit.ttl < min_ttl {
            return Ok(EditResponse::rejected(format!("TTL must be at least {}", min_ttl)));
        }
        Ok(EditResponse::accepted())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A sink that records every delivered report
#[derive(Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<CycleReport>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }

    pub fn reports(&self) -> Vec<CycleReport> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportSink for RecordingSink {
    async fn deliver(&self, report: &CycleReport) {
        self.reports.lock().unwrap().push(report.clone());
    }

    fn sink_name(&self) -> &'static str {
        "recording"
    }
}

/// An `A` record named `name` in the zone derived from it
pub fn a_record(name: &str) -> ProviderRecord {
    record(name, "A")
}

pub fn record(name: &str, record_type: &str) -> ProviderRecord {
    let zone = cfddns_core::DomainSpec::parse(name)
        .map(|d| d.zone().to_string())
        .unwrap_or_default();

    ProviderRecord {
        id: format!("id-{}-{}", record_type, name),
        zone_id: zone,
        name: name.to_string(),
        record_type: record_type.to_string(),
        content: "192.0.2.1".to_string(),
        ttl: 120,
    }
}

/// Helper to create a minimal DdnsConfig for testing
pub fn minimal_config(domains: &[&str]) -> DdnsConfig {
    DdnsConfig::new(
        ProviderConfig::Cloudflare {
            credentials: CloudflareCredentials::ApiToken {
                token: "test-token".to_string(),
            },
        },
        domains.iter().map(|d| d.to_string()).collect(),
    )
}

/// Build a loop wired to clones of the given doubles
pub fn build_loop(
    resolver: ScriptedResolver,
    provider: &MockDnsProvider,
    sink: &RecordingSink,
    config: &DdnsConfig,
) -> ReconciliationLoop {
    ReconciliationLoop::new(
        Box::new(resolver),
        DomainUpdater::new(Box::new(provider.clone())),
        Box::new(sink.clone()),
        config,
    )
    .expect("loop construction succeeds")
}
