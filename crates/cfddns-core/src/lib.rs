// # cfddns-core
//
// Core library for the cfddns dynamic DNS updater.
//
// ## Architecture Overview
//
// This library keeps a set of DNS "A" records pointed at the host's external
// address:
// - **AddressResolver**: Trait for discovering the external address, cross-checked
// - **DnsProvider**: Trait for listing and editing records via provider APIs
// - **ReportSink**: Trait for delivering per-cycle reports
// - **DomainUpdater**: Splits a name into label and zone, finds and edits its record
// - **ReconciliationLoop**: Orchestrates resolve → compare → update → report on a timer
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Change-Driven**: The provider is only contacted when the address changes
// 3. **Isolation**: A failing domain never blocks the others
// 4. **Library-First**: All core functionality can be used as a library

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod report;
pub mod traits;
pub mod updater;

// Re-export core types for convenience
pub use config::{
    AdoptionPolicy, CloudflareCredentials, DdnsConfig, EngineConfig, NotifyConfig, ProviderConfig,
    ResolverConfig,
};
pub use domain::DomainSpec;
pub use engine::{CycleDisposition, LoopState, Phase, ReconciliationLoop};
pub use error::{Error, Result};
pub use report::{CycleOutcome, CycleReport, OutcomeResult};
pub use traits::{AddressResolver, DnsProvider, NoopSink, ReportSink, ResolvedAddress};
pub use updater::{DomainUpdater, UpdatedRecord};
