// # Address Resolver Trait
//
// Defines the interface for discovering the host's current external address.
//
// ## Implementations
//
// - Two-service HTTP cross-check: `cfddns-resolver-http` crate
//
// ## Usage
//
// ```rust,ignore
// use cfddns_core::AddressResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* AddressResolver implementation */;
//
//     let address = resolver.resolve().await?;
//     println!("external address: {}", address);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::fmt;

/// An external address confirmed by independent lookups
///
/// The value is the raw text the services returned. It is compared byte for
/// byte and never reparsed, so it is kept as a string rather than an
/// `IpAddr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedAddress(String);

impl ResolvedAddress {
    /// Wrap a confirmed address
    ///
    /// Returns `None` for an empty value: an empty address is the "nothing
    /// resolved" marker in loop state and reports.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        if raw.is_empty() { None } else { Some(Self(raw)) }
    }

    /// The address text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResolvedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResolvedAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trait for external address resolution
///
/// # Contract
///
/// - Returns an address only when the implementation's independent sources
///   agree exactly
/// - Disagreement is [`Error::ResolutionConflict`], carrying both raw values
/// - Any network failure is [`Error::Transport`]
/// - No retries: the reconciliation loop retries on its next tick
///
/// Configuration problems (for example an unknown network interface) must be
/// reported when the resolver is constructed, not from `resolve()`.
///
/// [`Error::ResolutionConflict`]: crate::Error::ResolutionConflict
/// [`Error::Transport`]: crate::Error::Transport
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve the current external address
    async fn resolve(&self) -> Result<ResolvedAddress, crate::Error>;

    /// Short name for logging
    fn resolver_name(&self) -> &'static str {
        "resolver"
    }
}
