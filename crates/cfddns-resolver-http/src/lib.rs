// # HTTP Address Resolver
//
// This crate provides the cross-checking address resolver for cfddns.
//
// ## Architecture
//
// Two independently operated "what is my IP" services are queried
// concurrently. Their bodies are compared byte for byte: an address is only
// produced when both services agree. A single failing or disagreeing service
// fails the whole resolution, and the reconciliation loop tries again on its
// next tick.
//
// ## Interface Binding
//
// Outgoing requests can be bound to a named network interface. The interface
// is resolved once, at construction, to its first assigned address. An
// unknown interface is a configuration error, never a per-cycle one. The
// client always carries a bounded connect timeout (TCP connect and TLS
// handshake), so a misconfigured interface cannot hang a cycle forever.

use cfddns_core::config::ResolverConfig;
use cfddns_core::traits::{AddressResolver, ResolvedAddress};
use cfddns_core::{Error, Result};

use std::net::IpAddr;
use std::time::Duration;

/// Cross-checking HTTP address resolver
#[derive(Debug)]
pub struct HttpAddressResolver {
    /// Service queried first (reported as `service_a` on conflict)
    primary_url: String,

    /// Confirming service (reported as `service_b` on conflict)
    secondary_url: String,

    /// Source address requests are bound to, if any
    local_address: Option<IpAddr>,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpAddressResolver {
    /// Create a resolver for two services with default timeouts and no binding
    pub fn new(primary_url: impl Into<String>, secondary_url: impl Into<String>) -> Result<Self> {
        let config = ResolverConfig {
            primary_url: primary_url.into(),
            secondary_url: secondary_url.into(),
            ..ResolverConfig::default()
        };
        Self::from_config(&config)
    }

    /// Create a resolver from configuration
    ///
    /// Resolves the configured interface, if any. Fails with
    /// [`Error::Config`] when the interface does not exist or has no address.
    pub fn from_config(config: &ResolverConfig) -> Result<Self> {
        config.validate()?;

        let local_address = match &config.interface {
            Some(name) => {
                let address = interface_address(name)?;
                tracing::info!("Binding address resolution to {} ({})", name, address);
                Some(address)
            }
            None => None,
        };

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .local_address(local_address)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            primary_url: config.primary_url.clone(),
            secondary_url: config.secondary_url.clone(),
            local_address,
            client,
        })
    }

    /// Source address outgoing requests are bound to
    pub fn local_address(&self) -> Option<IpAddr> {
        self.local_address
    }

    /// Fetch the raw body of one service
    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::transport(format!("Request to {} failed: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::transport(format!(
                "{} answered HTTP {}",
                url,
                response.status()
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(format!("Failed to read response from {}: {}", url, e)))?;

        if body.is_empty() {
            return Err(Error::transport(format!("Empty response from {}", url)));
        }

        Ok(body.to_vec())
    }
}

#[async_trait::async_trait]
impl AddressResolver for HttpAddressResolver {
    async fn resolve(&self) -> Result<ResolvedAddress> {
        let (potential, confirm) =
            tokio::try_join!(self.fetch(&self.primary_url), self.fetch(&self.secondary_url))?;

        if potential != confirm {
            return Err(Error::conflict(
                String::from_utf8_lossy(&potential),
                String::from_utf8_lossy(&confirm),
            ));
        }

        let address = String::from_utf8(potential)
            .map_err(|_| Error::transport("Address services returned non-UTF-8 text"))?;

        tracing::debug!("External address confirmed by both services: {}", address);

        ResolvedAddress::new(address).ok_or_else(|| Error::transport("Empty address"))
    }

    fn resolver_name(&self) -> &'static str {
        "http"
    }
}

/// First address assigned to the named network interface
pub fn interface_address(name: &str) -> Result<IpAddr> {
    let interfaces = get_if_addrs::get_if_addrs()
        .map_err(|e| Error::config(format!("Failed to list network interfaces: {}", e)))?;

    interfaces
        .into_iter()
        .find(|interface| interface.name == name)
        .map(|interface| interface.ip())
        .ok_or_else(|| {
            Error::config(format!(
                "Network interface '{}' does not exist or has no address",
                name
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service(body: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ip"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    fn resolver(a: &MockServer, b: &MockServer) -> HttpAddressResolver {
        HttpAddressResolver::new(format!("{}/ip", a.uri()), format!("{}/ip", b.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_agreeing_services_resolve() {
        let a = service("198.51.100.7").await;
        let b = service("198.51.100.7").await;

        let address = resolver(&a, &b).resolve().await.unwrap();
        assert_eq!(address.as_str(), "198.51.100.7");
    }

    #[tokio::test]
    async fn test_disagreeing_services_conflict() {
        let a = service("198.51.100.7").await;
        let b = service("203.0.113.9").await;

        let err = resolver(&a, &b).resolve().await.unwrap_err();
        assert_eq!(err, Error::conflict("198.51.100.7", "203.0.113.9"));
    }

    #[tokio::test]
    async fn test_bodies_compared_as_raw_bytes() {
        let a = service("198.51.100.7").await;
        let b = service("198.51.100.7\n").await;

        let err = resolver(&a, &b).resolve().await.unwrap_err();
        assert!(matches!(err, Error::ResolutionConflict { .. }));
    }

    #[tokio::test]
    async fn test_server_error_is_transport() {
        let a = service("198.51.100.7").await;
        let b = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&b)
            .await;

        let err = resolver(&a, &b).resolve().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_empty_bodies_are_transport() {
        let a = service("").await;
        let b = service("").await;

        let err = resolver(&a, &b).resolve().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport() {
        let a = service("198.51.100.7").await;
        // Port 9 (discard) on localhost is not expected to accept connections
        let resolver =
            HttpAddressResolver::new(format!("{}/ip", a.uri()), "http://127.0.0.1:9/ip").unwrap();

        let err = resolver.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_unknown_interface_is_config_error() {
        let config = ResolverConfig {
            interface: Some("cfddns-no-such-if0".to_string()),
            ..ResolverConfig::default()
        };

        let err = HttpAddressResolver::from_config(&config).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    #[cfg(target_os = "linux")]
    fn test_loopback_interface_binding() {
        let config = ResolverConfig {
            interface: Some("lo".to_string()),
            ..ResolverConfig::default()
        };

        let resolver = HttpAddressResolver::from_config(&config).unwrap();
        assert!(resolver.local_address().unwrap().is_loopback());
    }

    #[test]
    fn test_identical_services_rejected() {
        assert!(HttpAddressResolver::new("https://a.example", "https://a.example").is_err());
    }
}
