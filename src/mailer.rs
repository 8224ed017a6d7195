use crate::config::Config;
use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSendmailTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("failed to build message: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("sendmail error: {0}")]
    Sendmail(#[from] lettre::transport::sendmail::Error),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A fully rendered outbound message, ready for any transport.
#[derive(Debug, Clone, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub from: String,
    pub reply_to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl OutgoingMail {
    fn to_message(&self) -> Result<Message, TransportError> {
        Ok(Message::builder()
            .to(self.to.parse::<Mailbox>()?)
            .from(self.from.parse::<Mailbox>()?)
            .reply_to(self.reply_to.parse::<Mailbox>()?)
            .subject(self.subject.clone())
            .multipart(MultiPart::alternative_plain_html(
                self.text.clone(),
                self.html.clone(),
            ))?)
    }
}

/// Delivery mechanism, resolved once at startup and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStrategy {
    Smtp {
        host: String,
        port: u16,
        secure: bool,
        username: String,
        password: String,
    },
    /// No real delivery; the message is serialized to the log instead.
    JsonSink,
    Sendmail {
        path: String,
    },
}

impl fmt::Display for TransportStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportStrategy::Smtp {
                host, port, secure, ..
            } => write!(f, "smtp {host}:{port} (secure: {secure})"),
            TransportStrategy::JsonSink => write!(f, "json sink (no delivery)"),
            TransportStrategy::Sendmail { path } => write!(f, "sendmail at {path}"),
        }
    }
}

/// Pick the delivery mechanism from configuration. First match wins:
/// authenticated SMTP when host, user, and password are all set; otherwise a
/// logging sink when no local relay is available; otherwise the local
/// sendmail relay.
pub fn select_transport(config: &Config) -> TransportStrategy {
    select_transport_with(config, relay_available(&config.sendmail_path))
}

fn select_transport_with(config: &Config, relay_available: bool) -> TransportStrategy {
    if let (Some(host), Some(username), Some(password)) =
        (&config.smtp_host, &config.smtp_user, &config.smtp_pass)
    {
        let port = config.smtp_port.unwrap_or(587);
        // Port 465 is implicit TLS even without the explicit flag.
        let secure = config.smtp_secure || config.smtp_port == Some(465);
        return TransportStrategy::Smtp {
            host: host.clone(),
            port,
            secure,
            username: username.clone(),
            password: password.clone(),
        };
    }
    if !relay_available {
        return TransportStrategy::JsonSink;
    }
    TransportStrategy::Sendmail {
        path: config.sendmail_path.clone(),
    }
}

fn relay_available(path: &str) -> bool {
    cfg!(unix) && std::path::Path::new(path).exists()
}

/// Object-safe seam over the concrete lettre transports so the dispatch
/// pipeline can be exercised with stub implementations.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError>;
}

/// Instantiate the concrete transport for a selected strategy.
pub fn build_mail_transport(
    strategy: &TransportStrategy,
) -> Result<Arc<dyn MailTransport>, TransportError> {
    match strategy {
        TransportStrategy::Smtp {
            host,
            port,
            secure,
            username,
            password,
        } => Ok(Arc::new(SmtpMailer::new(
            host,
            *port,
            *secure,
            username.clone(),
            password.clone(),
        )?)),
        TransportStrategy::JsonSink => Ok(Arc::new(JsonSinkMailer)),
        TransportStrategy::Sendmail { path } => Ok(Arc::new(SendmailMailer::new(path))),
    }
}

/// Authenticated SMTP delivery via lettre.
pub struct SmtpMailer {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(
        host: &str,
        port: u16,
        secure: bool,
        username: String,
        password: String,
    ) -> Result<Self, TransportError> {
        // secure = implicit TLS (465); otherwise STARTTLS upgrade (587).
        let builder = if secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
        };
        let inner = builder
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        Ok(SmtpMailer { inner })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        self.inner.send(mail.to_message()?).await?;
        Ok(())
    }
}

/// Development transport: records the would-be message in the log as JSON
/// and reports success without delivering anything.
pub struct JsonSinkMailer;

#[async_trait]
impl MailTransport for JsonSinkMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        match serde_json::to_string_pretty(mail) {
            Ok(json) => log::info!("json transport (no delivery):\n{json}"),
            Err(e) => log::warn!("json transport failed to serialize message: {e}"),
        }
        Ok(())
    }
}

/// Hand-off to a local sendmail relay process.
pub struct SendmailMailer {
    inner: AsyncSendmailTransport<Tokio1Executor>,
}

impl SendmailMailer {
    pub fn new(path: &str) -> Self {
        SendmailMailer {
            inner: AsyncSendmailTransport::new_with_command(path),
        }
    }
}

#[async_trait]
impl MailTransport for SendmailMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), TransportError> {
        self.inner.send(mail.to_message()?).await?;
        Ok(())
    }
}
