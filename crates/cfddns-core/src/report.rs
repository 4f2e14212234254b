//! Cycle outcomes and report formatting

use crate::error::Error;
use crate::traits::ResolvedAddress;
use chrono::{DateTime, Utc};

/// Domain label used for failures that affect the whole cycle
pub const ALL_DOMAINS: &str = "all";

/// Result of one domain (or of the whole cycle) within a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeResult {
    /// The record now points at the resolved address
    Updated,
    /// The attempt failed
    Failed(Error),
}

/// Outcome recorded for one domain attempted in a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Domain name, or [`ALL_DOMAINS`] for resolution failures
    pub domain: String,
    /// What happened
    pub result: OutcomeResult,
}

impl CycleOutcome {
    pub fn updated(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            result: OutcomeResult::Updated,
        }
    }

    pub fn failed(domain: impl Into<String>, error: Error) -> Self {
        Self {
            domain: domain.into(),
            result: OutcomeResult::Failed(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.result, OutcomeResult::Updated)
    }

    /// `OK`, or the error text
    pub fn status(&self) -> String {
        match &self.result {
            OutcomeResult::Updated => "OK".to_string(),
            OutcomeResult::Failed(error) => error.to_string(),
        }
    }
}

/// Consolidated report of one cycle that performed work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Address the cycle worked with, `None` when resolution failed
    pub resolved_address: Option<ResolvedAddress>,
    /// Outcomes in the order the domains were attempted
    pub outcomes: Vec<CycleOutcome>,
    /// When the cycle finished
    pub timestamp: DateTime<Utc>,
}

impl CycleReport {
    pub fn new(resolved_address: Option<ResolvedAddress>, outcomes: Vec<CycleOutcome>) -> Self {
        Self {
            resolved_address,
            outcomes,
            timestamp: Utc::now(),
        }
    }

    /// Report for a cycle whose address resolution failed
    pub fn resolution_failed(error: Error) -> Self {
        Self::new(None, vec![CycleOutcome::failed(ALL_DOMAINS, error)])
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Every attempted domain was updated
    pub fn all_succeeded(&self) -> bool {
        !self.outcomes.is_empty() && self.failed() == 0
    }

    /// One-line summary
    pub fn subject(&self) -> String {
        match &self.resolved_address {
            Some(address) => format!("External IP changed to {}", address),
            None => "Failed to resolve external IP".to_string(),
        }
    }

    /// Multi-line listing of every outcome
    pub fn body(&self) -> String {
        let mut body = String::from("Tried to update the following domains:\n");
        for outcome in &self.outcomes {
            body.push_str(&format!("\n{}:\n\t{}\n", outcome.domain, outcome.status()));
        }
        body
    }
}
