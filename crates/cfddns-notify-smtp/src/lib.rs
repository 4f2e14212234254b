// # SMTP Report Sink
//
// Delivers cycle reports as plain-text mail through an SMTP relay.
//
// The envelope identifies the reporting host: the subject is prefixed with
// `[<hostname>] `, the sender is `Cloudflare DNS <dns@<hostname>>` and the
// body starts with `<hostname>: `. The relay is contacted without TLS or
// authentication, as a local MTA would be.
//
// Delivery failures are logged and dropped. The reconciliation loop never
// sees them.

use async_trait::async_trait;
use cfddns_core::config::NotifyConfig;
use cfddns_core::report::CycleReport;
use cfddns_core::traits::ReportSink;
use cfddns_core::{Error, Result};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Display name of the report sender
const SENDER_NAME: &str = "Cloudflare DNS";

/// Report sink sending one mail per report
pub struct SmtpSink {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
    hostname: String,
}

impl std::fmt::Debug for SmtpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSink")
            .field("from", &self.from.to_string())
            .field("to", &self.to.to_string())
            .field("hostname", &self.hostname)
            .finish()
    }
}

impl SmtpSink {
    /// Create a sink from configuration
    ///
    /// Fails with [`Error::Config`] when the sender or recipient address
    /// cannot be parsed.
    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        config.validate()?;

        let sender = format!("dns@{}", config.hostname)
            .parse::<Address>()
            .map_err(|e| Error::config(format!("Invalid sender address: {}", e)))?;
        let to = config.recipient.parse::<Mailbox>().map_err(|e| {
            Error::config(format!("Invalid recipient '{}': {}", config.recipient, e))
        })?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
            .port(config.port)
            .build();

        tracing::info!(
            "Reports will be mailed to {} via {}:{}",
            config.recipient,
            config.server,
            config.port
        );

        Ok(Self {
            mailer,
            from: Mailbox::new(Some(SENDER_NAME.to_string()), sender),
            to,
            hostname: config.hostname.clone(),
        })
    }

    /// Build the mail for a report
    pub fn compose(&self, report: &CycleReport) -> Result<Message> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("[{}] {}", self.hostname, report.subject()))
            .header(ContentType::TEXT_PLAIN)
            .body(format!("{}: {}", self.hostname, report.body()))
            .map_err(|e| Error::notify(format!("Failed to build message: {}", e)))
    }

    /// Compose and send a report
    pub async fn send(&self, report: &CycleReport) -> Result<()> {
        let message = self.compose(report)?;
        self.mailer
            .send(message)
            .await
            .map_err(|e| Error::notify(format!("SMTP delivery failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ReportSink for SmtpSink {
    async fn deliver(&self, report: &CycleReport) {
        match self.send(report).await {
            Ok(()) => tracing::info!("Report mailed to {}: {}", self.to, report.subject()),
            Err(e) => tracing::error!("Failed to deliver report: {}", e),
        }
    }

    fn sink_name(&self) -> &'static str {
        "smtp"
    }
}
