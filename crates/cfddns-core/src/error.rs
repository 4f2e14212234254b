//! Error types for the cfddns system
//!
//! Every failure a cycle can produce is a variant here. Variants carry plain
//! strings so that an error can be cloned into a [`CycleReport`] and compared
//! in tests.
//!
//! [`CycleReport`]: crate::report::CycleReport

use thiserror::Error;

/// Result type alias for cfddns operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the cfddns system
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Network, timeout, HTTP status or decoding failure on an outbound call
    #[error("transport error: {0}")]
    Transport(String),

    /// The two address resolution services returned different bodies
    #[error("resolution conflict: {service_a} != {service_b}")]
    ResolutionConflict {
        /// Raw body returned by the primary service
        service_a: String,
        /// Raw body returned by the secondary service
        service_b: String,
    },

    /// A domain name could not be split into record label and zone
    #[error("invalid domain format: {0}")]
    InvalidDomainFormat(String),

    /// The zone listing held zero or several matching records
    #[error("unknown record: {0}")]
    UnknownRecord(String),

    /// The provider answered with an explicit error indicator
    #[error("request denied: {message}")]
    ProviderRejected {
        /// Message reported by the provider
        message: String,
    },

    /// Configuration errors (fatal at startup)
    #[error("configuration error: {0}")]
    Config(String),

    /// Report delivery failed
    #[error("notification error: {0}")]
    Notify(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a resolution conflict error
    pub fn conflict(service_a: impl Into<String>, service_b: impl Into<String>) -> Self {
        Self::ResolutionConflict {
            service_a: service_a.into(),
            service_b: service_b.into(),
        }
    }

    /// Create an invalid domain format error
    pub fn invalid_domain(domain: impl Into<String>) -> Self {
        Self::InvalidDomainFormat(domain.into())
    }

    /// Create an unknown record error
    pub fn unknown_record(msg: impl Into<String>) -> Self {
        Self::UnknownRecord(msg.into())
    }

    /// Create a provider rejection error
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::ProviderRejected {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a notification error
    pub fn notify(msg: impl Into<String>) -> Self {
        Self::Notify(msg.into())
    }

    /// Whether the process should stop instead of waiting for the next tick
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Transport(format!("malformed response: {}", err))
    }
}
