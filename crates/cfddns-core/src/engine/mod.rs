//! Reconciliation loop
//!
//! The ReconciliationLoop is responsible for:
//! - Resolving the current external address on every tick
//! - Suppressing provider calls while the address is unchanged
//! - Updating every configured domain when it changes
//! - Handing a consolidated report to the ReportSink
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ AddressResolver │─── ResolvedAddress ───┐
//! └─────────────────┘                       │
//!                                           ▼
//!                                ┌────────────────────┐
//!                                │ ReconciliationLoop │
//!                                └────────────────────┘
//!                                           │
//!              ┌────────────────────────────┼──────────────────────┐
//!              │                            │                      │
//!              ▼                            ▼                      ▼
//!     ┌─────────────┐             ┌───────────────┐        ┌────────────┐
//!     │  LoopState  │             │ DomainUpdater │        │ ReportSink │
//!     │  (compare)  │             │ (× N domains) │        │  (report)  │
//!     └─────────────┘             └───────────────┘        └────────────┘
//! ```
//!
//! ## State Machine
//!
//! `Idle → Resolving → (Unchanged | Updating) → Idle`, forever.
//!
//! ## Retries
//!
//! There are none inside a cycle. Every failure waits for the next tick,
//! which is the only retry mechanism.

use crate::config::{AdoptionPolicy, DdnsConfig};
use crate::domain::DomainSpec;
use crate::error::Result;
use crate::report::{CycleOutcome, CycleReport};
use crate::traits::{AddressResolver, ReportSink, ResolvedAddress};
use crate::updater::DomainUpdater;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Phase of the reconciliation state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next tick
    Idle,
    /// Querying the address resolver
    Resolving,
    /// Address equals the last applied one, nothing to do
    Unchanged,
    /// Pushing the new address to every domain
    Updating,
}

/// Mutable state owned by one loop instance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopState {
    /// Address adopted by the last cycle that applied one
    pub last_applied_address: Option<ResolvedAddress>,
}

/// What a single cycle did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleDisposition {
    /// Address resolution failed; the report was handed to the sink
    ResolutionFailed(CycleReport),
    /// Address unchanged; the provider was not contacted
    Unchanged(ResolvedAddress),
    /// Domains were updated
    Applied {
        /// Per-domain outcomes of this cycle
        report: CycleReport,
        /// Whether the report went to the sink
        reported: bool,
    },
}

/// Core reconciliation loop
///
/// ## Lifecycle
///
/// 1. Create with [`ReconciliationLoop::new()`]
/// 2. Start with [`ReconciliationLoop::run()`]
/// 3. Loop runs until the process is interrupted
///
/// ## Threading
///
/// One cycle runs to completion before the next one starts. All state is
/// owned by the instance, so independent instances never interfere.
pub struct ReconciliationLoop {
    /// External address discovery
    resolver: Box<dyn AddressResolver>,

    /// Per-domain updates
    updater: DomainUpdater,

    /// Report delivery
    sink: Box<dyn ReportSink>,

    /// Domains to manage, in update order
    domains: Vec<DomainSpec>,

    /// TTL written to every record
    ttl: u32,

    /// Delay between cycles
    interval: Duration,

    /// When a new address counts as applied
    adoption: AdoptionPolicy,

    /// Last applied address
    state: LoopState,

    /// Current phase (for diagnostics)
    phase: Phase,

    /// True until the first successful resolution of this instance
    starting: bool,
}

impl ReconciliationLoop {
    /// Create a new reconciliation loop
    ///
    /// # Parameters
    ///
    /// - `resolver`: AddressResolver implementation
    /// - `updater`: DomainUpdater wrapping the DNS provider
    /// - `sink`: ReportSink implementation
    /// - `config`: cfddns configuration
    pub fn new(
        resolver: Box<dyn AddressResolver>,
        updater: DomainUpdater,
        sink: Box<dyn ReportSink>,
        config: &DdnsConfig,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            resolver,
            updater,
            sink,
            domains: config.domain_specs()?,
            ttl: config.ttl,
            interval: Duration::from_secs(config.engine.interval_secs),
            adoption: config.engine.adoption,
            state: LoopState::default(),
            phase: Phase::Idle,
            starting: true,
        })
    }

    /// Override the delay between cycles
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Current loop state
    pub fn state(&self) -> &LoopState {
        &self.state
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Run the loop until Ctrl-C
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the loop until `shutdown_rx` fires (or Ctrl-C when `None`)
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(
            "Loop started: {} domain(s), interval {:?}, resolver {}, provider {}, sink {}",
            self.domains.len(),
            self.interval,
            self.resolver.resolver_name(),
            self.updater.provider_name(),
            self.sink.sink_name()
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    // A dropped sender counts as a shutdown request too
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            let interval = self.interval;
            let cycle = async {
                self.run_cycle().await;
                tokio::time::sleep(interval).await;
            };

            let stopped = tokio::select! {
                _ = cycle => false,
                _ = &mut shutdown => true,
            };

            if stopped {
                info!("Shutdown signal received, reconciliation loop stopped");
                self.phase = Phase::Idle;
                return Ok(());
            }
        }
    }

    /// Run one full cycle: resolve, compare, update, report
    pub async fn run_cycle(&mut self) -> CycleDisposition {
        self.transition(Phase::Resolving);

        let address = match self.resolver.resolve().await {
            Ok(address) => address,
            Err(e) => {
                error!("Failed to resolve external address: {}", e);
                let report = CycleReport::resolution_failed(e);
                self.sink.deliver(&report).await;
                self.transition(Phase::Idle);
                return CycleDisposition::ResolutionFailed(report);
            }
        };

        let first_resolution = std::mem::replace(&mut self.starting, false);

        if self.state.last_applied_address.as_ref() == Some(&address) {
            self.transition(Phase::Unchanged);
            debug!("External address unchanged ({}), skipping update", address);
            self.transition(Phase::Idle);
            return CycleDisposition::Unchanged(address);
        }

        self.transition(Phase::Updating);
        info!("Updating IP address to {}", address);

        let mut outcomes = Vec::with_capacity(self.domains.len());
        for domain in &self.domains {
            match self.updater.update(domain, &address, self.ttl).await {
                Ok(_) => {
                    info!("Domain updated: {}", domain);
                    outcomes.push(CycleOutcome::updated(domain.fqdn()));
                }
                Err(e) => {
                    warn!("Failed to update {}: {}", domain, e);
                    outcomes.push(CycleOutcome::failed(domain.fqdn(), e));
                }
            }
        }

        let report = CycleReport::new(Some(address.clone()), outcomes);
        self.adopt(address, &report);

        let reported = if first_resolution {
            debug!("First resolution of this process, report not sent");
            false
        } else {
            self.sink.deliver(&report).await;
            true
        };

        self.transition(Phase::Idle);
        CycleDisposition::Applied { report, reported }
    }

    /// Record `address` as applied, once per cycle, per the adoption policy
    fn adopt(&mut self, address: ResolvedAddress, report: &CycleReport) {
        let adopt = match self.adoption {
            AdoptionPolicy::FirstSuccess => report.succeeded() > 0,
            AdoptionPolicy::AllSucceeded => report.all_succeeded(),
        };

        if adopt {
            debug!("Adopting {} as last applied address", address);
            self.state.last_applied_address = Some(address);
        } else {
            warn!(
                "{} of {} domain(s) failed, keeping last applied address {:?}",
                report.failed(),
                report.outcomes.len(),
                self.state.last_applied_address.as_ref().map(ResolvedAddress::as_str)
            );
        }
    }

    fn transition(&mut self, next: Phase) {
        debug!("Loop phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_starts_empty() {
        let state = LoopState::default();
        assert!(state.last_applied_address.is_none());
    }

    #[test]
    fn test_disposition_clone_eq() {
        let disposition = CycleDisposition::Unchanged(ResolvedAddress::new("1.2.3.4").unwrap());
        assert_eq!(disposition.clone(), disposition);
    }
}
