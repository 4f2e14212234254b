// # cfddnsd - Cloudflare dynamic DNS daemon
//
// Thin integration layer: reads configuration from the environment, wires the
// HTTP address resolver, the Cloudflare provider and the report sink into a
// `ReconciliationLoop`, and runs it until SIGTERM or SIGINT. All DNS logic
// lives in cfddns-core.
//
// ## Configuration
//
// ### Loop
// - `DDNS_DOMAINS`: Comma-separated list of fully qualified names (required)
// - `DDNS_UPDATE_INTERVAL`: Seconds between cycles (default 60)
// - `DDNS_TTL`: Record TTL in seconds, 1 for automatic (default 120)
// - `DDNS_ADOPT_POLICY`: `first-success` (default) or `all-succeeded`
//
// ### Cloudflare
// - `DDNS_CF_API_TOKEN`: Scoped API token
// - `DDNS_CF_EMAIL` / `DDNS_CF_API_KEY`: Legacy global key pair
// - `DDNS_MODE`: `dry-run` to log edits instead of sending them
//
// ### Address resolution
// - `DDNS_INTERFACE`: Bind resolution requests to this interface
// - `DDNS_IP_SERVICE_PRIMARY` / `DDNS_IP_SERVICE_SECONDARY`: Service URLs
//
// ### Reports
// - `DDNS_MAIL_SERVER`: SMTP relay `host[:port]` (reports are dropped when unset)
// - `DDNS_MAIL_TO`: Recipient (defaults to `DDNS_CF_EMAIL`)
// - `DDNS_NOTIFY_HOSTNAME`: Host name shown in reports (defaults to the system host name)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DDNS_DOMAINS=home.example.com,vpn.example.co.uk
// export DDNS_CF_API_TOKEN=your_token
// export DDNS_MAIL_SERVER=localhost:25
// export DDNS_MAIL_TO=admin@example.com
//
// cfddnsd
// ```

use anyhow::Result;
use cfddns_core::config::{
    AdoptionPolicy, CloudflareCredentials, DEFAULT_PRIMARY_SERVICE, DEFAULT_SECONDARY_SERVICE,
    DdnsConfig, EngineConfig, NotifyConfig, ProviderConfig, ResolverConfig,
};
use cfddns_core::domain::{DomainSpec, parse_domain_list};
use cfddns_core::{DomainUpdater, NoopSink, ReconciliationLoop, ReportSink};
use cfddns_provider_cloudflare::CloudflareProvider;
use cfddns_resolver_http::HttpAddressResolver;
use std::env;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl DdnsExitCode {
    /// Exit code for a failure while building the loop
    ///
    /// Configuration problems are fatal; anything else is a runtime failure.
    fn for_startup_error(err: &cfddns_core::Error) -> Self {
        if err.is_fatal() {
            Self::ConfigError
        } else {
            Self::RuntimeError
        }
    }
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration, as read from the environment
#[derive(Debug)]
struct Config {
    domains: Vec<DomainSpec>,
    update_interval: u64,
    ttl: u32,
    adopt_policy: AdoptionPolicy,
    credentials: CloudflareCredentials,
    interface: Option<String>,
    primary_service: String,
    secondary_service: String,
    mail_server: Option<String>,
    mail_to: Option<String>,
    hostname: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        // Unset and empty are the same thing
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let credentials = match (
            var("DDNS_CF_API_TOKEN"),
            var("DDNS_CF_EMAIL"),
            var("DDNS_CF_API_KEY"),
        ) {
            (Some(token), _, _) => CloudflareCredentials::ApiToken { token },
            (None, Some(email), Some(key)) => CloudflareCredentials::GlobalKey { email, key },
            _ => anyhow::bail!(
                "Cloudflare credentials are required. \
                Set DDNS_CF_API_TOKEN, or both DDNS_CF_EMAIL and DDNS_CF_API_KEY"
            ),
        };

        let update_interval = match var("DDNS_UPDATE_INTERVAL") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| {
                    anyhow::anyhow!("DDNS_UPDATE_INTERVAL must be a number. Got: {}", s)
                })?,
            None => EngineConfig::default().interval_secs,
        };

        let ttl = match var("DDNS_TTL") {
            Some(s) => s
                .trim()
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("DDNS_TTL must be a number. Got: {}", s))?,
            None => 120,
        };

        let adopt_policy = match var("DDNS_ADOPT_POLICY") {
            Some(s) => s.trim().parse::<AdoptionPolicy>()?,
            None => AdoptionPolicy::default(),
        };

        let mail_to = var("DDNS_MAIL_TO").or_else(|| credentials.email().map(str::to_string));

        let hostname = var("DDNS_NOTIFY_HOSTNAME")
            .or_else(system_hostname)
            .unwrap_or_else(|| "localhost".to_string());

        Ok(Self {
            domains: parse_domain_list(&var("DDNS_DOMAINS").unwrap_or_default())?,
            update_interval,
            ttl,
            adopt_policy,
            credentials,
            interface: var("DDNS_INTERFACE"),
            primary_service: var("DDNS_IP_SERVICE_PRIMARY")
                .unwrap_or_else(|| DEFAULT_PRIMARY_SERVICE.to_string()),
            secondary_service: var("DDNS_IP_SERVICE_SECONDARY")
                .unwrap_or_else(|| DEFAULT_SECONDARY_SERVICE.to_string()),
            mail_server: var("DDNS_MAIL_SERVER"),
            mail_to,
            hostname,
            log_level: var("DDNS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks what the environment can get wrong before anything is built:
    /// domain syntax, the update interval, log level and the mail settings.
    /// The TTL is left to the provider. The resulting [`DdnsConfig`] is
    /// validated again by the loop itself.
    fn validate(&self) -> Result<()> {
        if self.domains.is_empty() {
            anyhow::bail!(
                "DDNS_DOMAINS must contain at least one domain. \
                Set it via: export DDNS_DOMAINS=home.example.com,vpn.example.com"
            );
        }

        for domain in &self.domains {
            validate_domain_name(domain.fqdn())?;
        }

        if !(1..=86400).contains(&self.update_interval) {
            anyhow::bail!(
                "DDNS_UPDATE_INTERVAL must be between 1 and 86400 seconds. Got: {}",
                self.update_interval
            );
        }

        for url in [&self.primary_service, &self.secondary_service] {
            if url.starts_with("http://") {
                warn!(
                    "Address service {} uses HTTP (not HTTPS). \
                    Consider using HTTPS.",
                    url
                );
            }
        }

        if self.mail_server.is_some() && self.mail_to.is_none() {
            anyhow::bail!(
                "DDNS_MAIL_TO is required when DDNS_MAIL_SERVER is set \
                (or use global key credentials with DDNS_CF_EMAIL)"
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DDNS_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration
    fn to_ddns_config(&self) -> Result<DdnsConfig> {
        let notify = match (&self.mail_server, &self.mail_to) {
            (Some(server), Some(recipient)) => {
                let (server, port) = NotifyConfig::parse_server(server)?;
                Some(NotifyConfig {
                    server,
                    port,
                    recipient: recipient.clone(),
                    hostname: self.hostname.clone(),
                })
            }
            _ => None,
        };

        let config = DdnsConfig {
            resolver: ResolverConfig {
                primary_url: self.primary_service.clone(),
                secondary_url: self.secondary_service.clone(),
                interface: self.interface.clone(),
                ..ResolverConfig::default()
            },
            provider: ProviderConfig::Cloudflare {
                credentials: self.credentials.clone(),
            },
            domains: self.domains.iter().map(|d| d.fqdn().to_string()).collect(),
            ttl: self.ttl,
            engine: EngineConfig {
                interval_secs: self.update_interval,
                adoption: self.adopt_policy,
            },
            notify,
        };

        config.validate()?;
        Ok(config)
    }

    fn tracing_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Host name of this machine, if the system reports a usable one
fn system_hostname() -> Option<String> {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .filter(|name| !name.trim().is_empty())
}

/// Validate that a string is a valid domain name
///
/// Basic RFC 1035 checks; the label/zone split is done by the core.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.tracing_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Validate configuration
    let ddns_config = match config.validate().and_then(|_| config.to_ddns_config()) {
        Ok(ddns_config) => ddns_config,
        Err(e) => {
            error!("Configuration validation error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    info!("Starting cfddnsd daemon");
    info!("Configuration loaded: {} domain(s)", ddns_config.domains.len());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        // Components are built inside the runtime: the resolver and the
        // mailer need a reactor
        let reconciler = match build_loop(&ddns_config) {
            Ok(reconciler) => reconciler,
            Err(e) => {
                error!("Startup error: {}", e);
                return DdnsExitCode::for_startup_error(&e);
            }
        };

        if let Err(e) = run_daemon(reconciler).await {
            error!("Daemon error: {}", e);
            DdnsExitCode::RuntimeError
        } else {
            DdnsExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Wire resolver, provider and sink into a reconciliation loop
fn build_loop(config: &DdnsConfig) -> cfddns_core::Result<ReconciliationLoop> {
    let resolver = HttpAddressResolver::from_config(&config.resolver)?;
    let provider = CloudflareProvider::from_config(&config.provider)?;
    let sink = build_sink(config)?;

    for domain in &config.domains {
        info!("Managing domain: {}", domain);
    }

    ReconciliationLoop::new(
        Box::new(resolver),
        DomainUpdater::new(Box::new(provider)),
        sink,
        config,
    )
}

#[cfg(feature = "smtp")]
fn build_sink(config: &DdnsConfig) -> cfddns_core::Result<Box<dyn ReportSink>> {
    match &config.notify {
        Some(notify) => Ok(Box::new(cfddns_notify_smtp::SmtpSink::from_config(notify)?)),
        None => {
            info!("DDNS_MAIL_SERVER not set, reports are only logged");
            Ok(Box::new(NoopSink))
        }
    }
}

#[cfg(not(feature = "smtp"))]
fn build_sink(config: &DdnsConfig) -> cfddns_core::Result<Box<dyn ReportSink>> {
    if config.notify.is_some() {
        warn!("Built without SMTP support, DDNS_MAIL_SERVER is ignored");
    }
    Ok(Box::new(NoopSink))
}

/// Run the loop until a shutdown signal arrives
async fn run_daemon(mut reconciler: ReconciliationLoop) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let signals = tokio::spawn(async move {
        let signal = wait_for_shutdown().await;
        // Stops the loop whether or not the handlers could be installed
        let _ = shutdown_tx.send(());
        signal
    });

    reconciler.run_with_shutdown(Some(shutdown_rx)).await?;

    let signal = signals.await??;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received, or an error if the handlers
/// cannot be installed.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        Config::from_lookup(lookup(vars))
    }

    const TOKEN: (&str, &str) = ("DDNS_CF_API_TOKEN", "test-token");
    const DOMAINS: (&str, &str) = ("DDNS_DOMAINS", "home.example.com, vpn.example.co.uk");

    #[test]
    fn test_minimal_environment() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_NOTIFY_HOSTNAME", "gw")]).unwrap();
        config.validate().unwrap();

        let domains: Vec<&str> = config.domains.iter().map(DomainSpec::fqdn).collect();
        assert_eq!(domains, vec!["home.example.com", "vpn.example.co.uk"]);
        assert_eq!(config.update_interval, 60);
        assert_eq!(config.ttl, 120);
        assert_eq!(config.adopt_policy, AdoptionPolicy::FirstSuccess);
        assert_eq!(config.primary_service, DEFAULT_PRIMARY_SERVICE);
        assert_eq!(config.hostname, "gw");

        let ddns_config = config.to_ddns_config().unwrap();
        assert!(ddns_config.notify.is_none());
        assert_eq!(ddns_config.engine.interval_secs, 60);
    }

    #[test]
    fn test_missing_credentials() {
        assert!(load(&[DOMAINS]).is_err());
        assert!(load(&[DOMAINS, ("DDNS_CF_EMAIL", "a@example.com")]).is_err());
    }

    #[test]
    fn test_global_key_credentials_default_mail_recipient() {
        let config = load(&[
            DOMAINS,
            ("DDNS_CF_EMAIL", "admin@example.com"),
            ("DDNS_CF_API_KEY", "global-key"),
            ("DDNS_MAIL_SERVER", "mail.example.com:2525"),
            ("DDNS_NOTIFY_HOSTNAME", "gw.example.net"),
        ])
        .unwrap();
        config.validate().unwrap();

        let notify = config.to_ddns_config().unwrap().notify.unwrap();
        assert_eq!(notify.server, "mail.example.com");
        assert_eq!(notify.port, 2525);
        assert_eq!(notify.recipient, "admin@example.com");
        assert_eq!(notify.hostname, "gw.example.net");
    }

    #[test]
    fn test_mail_server_without_recipient() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_MAIL_SERVER", "localhost")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_ranges_validated() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_UPDATE_INTERVAL", "0")]).unwrap();
        assert!(config.validate().is_err());

        assert!(load(&[TOKEN, DOMAINS, ("DDNS_UPDATE_INTERVAL", "soon")]).is_err());
        assert!(load(&[TOKEN, DOMAINS, ("DDNS_TTL", "-5")]).is_err());
    }

    #[test]
    fn test_ttl_forwarded_without_range_check() {
        for ttl in ["1", "30", "604800"] {
            let config = load(&[TOKEN, DOMAINS, ("DDNS_TTL", ttl)]).unwrap();
            config.validate().unwrap();
            let ddns_config = config.to_ddns_config().unwrap();
            assert_eq!(ddns_config.ttl.to_string(), ttl);
        }
    }

    #[test]
    fn test_adopt_policy() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_ADOPT_POLICY", "all-succeeded")]).unwrap();
        assert_eq!(config.adopt_policy, AdoptionPolicy::AllSucceeded);

        assert!(load(&[TOKEN, DOMAINS, ("DDNS_ADOPT_POLICY", "sometimes")]).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_LOG_LEVEL", "loud")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_domain_list_parsing() {
        let config = load(&[TOKEN, ("DDNS_DOMAINS", " b.example.com,, a.example.co.uk ,")])
            .unwrap();
        assert_eq!(config.domains[0].zone(), "example.com");
        assert_eq!(config.domains[1].record_label(), "a");
        assert_eq!(config.domains[1].zone(), "example.co.uk");
        assert_eq!(
            config.to_ddns_config().unwrap().domains,
            vec!["b.example.com", "a.example.co.uk"]
        );

        // Valid DNS syntax, but there is no record label to update
        let err = load(&[TOKEN, ("DDNS_DOMAINS", "home.example.com,example.com")]).unwrap_err();
        assert!(err.to_string().contains("invalid domain format"));

        let config = load(&[TOKEN, ("DDNS_DOMAINS", " , ")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_notify_hostname_override() {
        let config = load(&[TOKEN, DOMAINS, ("DDNS_NOTIFY_HOSTNAME", "gw.example.net")]).unwrap();
        assert_eq!(config.hostname, "gw.example.net");

        let config = load(&[TOKEN, DOMAINS]).unwrap();
        assert!(!config.hostname.is_empty());
        assert_eq!(
            config.hostname,
            system_hostname().unwrap_or_else(|| "localhost".to_string())
        );
    }

    #[test]
    fn test_startup_error_exit_codes() {
        let config_error = cfddns_core::Error::config("unknown interface eth9");
        assert_eq!(
            DdnsExitCode::for_startup_error(&config_error),
            DdnsExitCode::ConfigError
        );

        let transport = cfddns_core::Error::transport("connection refused");
        assert_eq!(
            DdnsExitCode::for_startup_error(&transport),
            DdnsExitCode::RuntimeError
        );
        assert_eq!(DdnsExitCode::RuntimeError as u8, 2);
    }

    #[test]
    fn test_validate_domain_name() {
        assert!(validate_domain_name("home.example.com").is_ok());
        assert!(validate_domain_name("").is_err());
        assert!(validate_domain_name("a..example.com").is_err());
        assert!(validate_domain_name("-bad.example.com").is_err());
        assert!(validate_domain_name("under_score.example.com").is_err());
        assert!(validate_domain_name(&format!("{}.example.com", "a".repeat(64))).is_err());
    }

    #[test]
    fn test_credentials_not_in_debug() {
        let config = load(&[TOKEN, DOMAINS]).unwrap();
        assert!(!format!("{:?}", config).contains("test-token"));
    }
}
