//! Configuration types for the cfddns system
//!
//! This module defines all configuration structures used throughout the crate.
//! The daemon builds a [`DdnsConfig`] from its environment; embedders may
//! deserialize one from any serde format.

use crate::domain::DomainSpec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default address resolution service
pub const DEFAULT_PRIMARY_SERVICE: &str = "https://api.ipify.org";

/// Default confirming address resolution service
pub const DEFAULT_SECONDARY_SERVICE: &str = "https://ifconfig.me/ip";

/// Main cfddns configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Address resolution configuration
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Fully qualified names to manage, in update order
    pub domains: Vec<String>,

    /// TTL written to every record (seconds), passed to the provider as is
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Loop settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Report delivery (optional)
    #[serde(default)]
    pub notify: Option<NotifyConfig>,
}

impl DdnsConfig {
    /// Create a configuration for the given provider and domains with defaults
    pub fn new(provider: ProviderConfig, domains: Vec<String>) -> Self {
        Self {
            resolver: ResolverConfig::default(),
            provider,
            domains,
            ttl: default_ttl(),
            engine: EngineConfig::default(),
            notify: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.domains.is_empty() {
            return Err(crate::Error::config("No domains configured"));
        }

        for domain in &self.domains {
            DomainSpec::parse(domain)?;
        }

        self.resolver.validate()?;
        self.provider.validate()?;
        self.engine.validate()?;

        if let Some(notify) = &self.notify {
            notify.validate()?;
        }

        Ok(())
    }

    /// Parse the configured domains in order
    pub fn domain_specs(&self) -> Result<Vec<DomainSpec>, crate::Error> {
        self.domains.iter().map(|d| DomainSpec::parse(d)).collect()
    }
}

/// Address resolution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// First "what is my IP" endpoint
    #[serde(default = "default_primary_service")]
    pub primary_url: String,

    /// Second, independently operated endpoint
    #[serde(default = "default_secondary_service")]
    pub secondary_url: String,

    /// Bind outgoing requests to this network interface (e.g., "eth0")
    #[serde(default)]
    pub interface: Option<String>,

    /// Connect timeout, TCP and TLS handshake (seconds)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for url in [&self.primary_url, &self.secondary_url] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "Address service URL must use HTTP or HTTPS scheme. Got: {}",
                    url
                )));
            }
        }

        if self.primary_url == self.secondary_url {
            return Err(crate::Error::config(
                "Address services must be two distinct endpoints",
            ));
        }

        if let Some(interface) = &self.interface
            && interface.trim().is_empty()
        {
            return Err(crate::Error::config("Interface name cannot be empty"));
        }

        if self.connect_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(crate::Error::config("Resolver timeouts must be > 0"));
        }

        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            primary_url: default_primary_service(),
            secondary_url: default_secondary_service(),
            interface: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Cloudflare provider
    Cloudflare {
        /// Opaque credentials
        credentials: CloudflareCredentials,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Cloudflare { credentials } => credentials.validate(),
        }
    }
}

/// Cloudflare authentication material
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CloudflareCredentials {
    /// Scoped API token (Zone:DNS:Edit)
    ApiToken {
        /// Token value
        token: String,
    },
    /// Legacy account e-mail and global API key
    GlobalKey {
        /// Account e-mail
        email: String,
        /// Global API key
        key: String,
    },
}

impl CloudflareCredentials {
    /// Validate that no credential field is empty
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CloudflareCredentials::ApiToken { token } if token.is_empty() => {
                Err(crate::Error::config("Cloudflare API token cannot be empty"))
            }
            CloudflareCredentials::GlobalKey { email, key }
                if email.is_empty() || key.is_empty() =>
            {
                Err(crate::Error::config(
                    "Cloudflare e-mail and global API key are both required",
                ))
            }
            _ => Ok(()),
        }
    }

    /// Account e-mail, if these are global key credentials
    pub fn email(&self) -> Option<&str> {
        match self {
            CloudflareCredentials::GlobalKey { email, .. } => Some(email),
            CloudflareCredentials::ApiToken { .. } => None,
        }
    }
}

// Secrets never reach logs
impl fmt::Debug for CloudflareCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudflareCredentials::ApiToken { .. } => f
                .debug_struct("ApiToken")
                .field("token", &"<REDACTED>")
                .finish(),
            CloudflareCredentials::GlobalKey { email, .. } => f
                .debug_struct("GlobalKey")
                .field("email", email)
                .field("key", &"<REDACTED>")
                .finish(),
        }
    }
}

/// When a resolved address counts as applied after a cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdoptionPolicy {
    /// Adopt once at least one domain was updated
    #[default]
    FirstSuccess,
    /// Adopt only when every domain was updated
    AllSucceeded,
}

impl std::str::FromStr for AdoptionPolicy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first-success" => Ok(AdoptionPolicy::FirstSuccess),
            "all-succeeded" => Ok(AdoptionPolicy::AllSucceeded),
            other => Err(crate::Error::config(format!(
                "Unknown adoption policy '{}'. Valid: first-success, all-succeeded",
                other
            ))),
        }
    }
}

/// Loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Delay between the end of one cycle and the start of the next (in seconds)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Address adoption policy
    #[serde(default)]
    pub adoption: AdoptionPolicy,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.interval_secs == 0 || self.interval_secs > 86400 {
            return Err(crate::Error::config(format!(
                "Update interval must be between 1 and 86400 seconds. Got: {}",
                self.interval_secs
            )));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            adoption: AdoptionPolicy::default(),
        }
    }
}

/// SMTP report delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Mail server host
    pub server: String,

    /// Mail server port
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    /// Report recipient
    pub recipient: String,

    /// Host name used in the sender address and subject
    pub hostname: String,
}

impl NotifyConfig {
    /// Parse a `host[:port]` server string
    pub fn parse_server(server: &str) -> Result<(String, u16), crate::Error> {
        let server = server.trim();
        match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    crate::Error::config(format!("Invalid mail server port in '{}'", server))
                })?;
                Ok((host.to_string(), port))
            }
            None => Ok((server.to_string(), default_smtp_port())),
        }
    }

    /// Validate the notification configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.server.is_empty() {
            return Err(crate::Error::config("Mail server cannot be empty"));
        }
        if !self.recipient.contains('@') {
            return Err(crate::Error::config(format!(
                "Mail recipient '{}' is not an e-mail address",
                self.recipient
            )));
        }
        if self.hostname.is_empty() {
            return Err(crate::Error::config("Mail hostname cannot be empty"));
        }
        Ok(())
    }
}

fn default_primary_service() -> String {
    DEFAULT_PRIMARY_SERVICE.to_string()
}

fn default_secondary_service() -> String {
    DEFAULT_SECONDARY_SERVICE.to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_ttl() -> u32 {
    120
}

fn default_interval_secs() -> u64 {
    60
}

fn default_smtp_port() -> u16 {
    25
}
