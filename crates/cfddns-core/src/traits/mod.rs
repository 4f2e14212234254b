//! Core traits for the cfddns system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`AddressResolver`]: Discover the current external address
//! - [`DnsProvider`]: List and edit records via provider APIs
//! - [`ReportSink`]: Deliver cycle reports

pub mod address_resolver;
pub mod dns_provider;
pub mod report_sink;

pub use address_resolver::{AddressResolver, ResolvedAddress};
pub use dns_provider::{DnsProvider, EditResponse, ProviderRecord, RECORD_TYPE_A, RecordEdit};
pub use report_sink::{NoopSink, ReportSink};
