use crate::mailer::{MailTransport, OutgoingMail, TransportError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Message body synthesized for a newsletter signup that carries no message.
pub const NEWSLETTER_MARKER: &str = "Subscribe to newsletter";

/// The two failure classes of the dispatch pipeline. The Display strings are
/// the exact texts returned across the HTTP boundary; transport detail stays
/// in the source chain and is only ever logged.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Missing required fields")]
    Validation,
    #[error("Failed to send email")]
    Transport(#[source] TransportError),
}

/// Inbound contact payload from the untrusted boundary. Missing fields
/// deserialize as empty so they fail validation instead of rejecting the
/// body outright.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub newsletter: bool,
}

/// The sole contract returned across the boundary.
#[derive(Debug, Serialize)]
pub struct DispatchOutcome {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn ok() -> Self {
        DispatchOutcome {
            ok: true,
            error: None,
        }
    }
}

impl DispatchError {
    pub fn outcome(&self) -> DispatchOutcome {
        DispatchOutcome {
            ok: false,
            error: Some(self.to_string()),
        }
    }
}

/// Replace every occurrence of the five HTML-significant characters.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn render_text(name: &str, email: &str, message: &str) -> String {
    format!("Name: {name}\nEmail: {email}\n\n{message}")
}

fn render_html(name: &str, email: &str, message: &str) -> String {
    format!(
        "<h2>New Website Inquiry</h2>\n\
         <table cellpadding=\"6\" cellspacing=\"0\" border=\"1\" style=\"border-collapse:collapse;border-color:#ddd;\">\n\
         <tr><th align=\"left\">Name</th><td>{}</td></tr>\n\
         <tr><th align=\"left\">Email</th><td>{}</td></tr>\n\
         <tr><th align=\"left\">Message</th><td><pre style=\"white-space:pre-wrap\">{}</pre></td></tr>\n\
         </table>",
        escape_html(name),
        escape_html(email),
        escape_html(message),
    )
}

/// Validates contact submissions, renders the text/HTML bodies, and hands
/// the result to the selected transport. One instance per process, shared
/// read-only across requests.
pub struct ContactMailer {
    transport: Arc<dyn MailTransport>,
    to_address: String,
    from_address: Option<String>,
}

impl ContactMailer {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        to_address: String,
        from_address: Option<String>,
    ) -> Self {
        ContactMailer {
            transport,
            to_address,
            from_address,
        }
    }

    /// Process one submission end to end. `request_host` is the Host the
    /// client addressed, used to synthesize a sender when no override is
    /// configured. No side effect happens before validation passes.
    pub async fn handle(
        &self,
        request: &ContactRequest,
        request_host: &str,
    ) -> Result<(), DispatchError> {
        let name = request.name.trim();
        let email = request.email.trim();
        let mut message = request.message.trim().to_string();
        if message.is_empty() && request.newsletter {
            message = NEWSLETTER_MARKER.to_string();
        }
        if name.is_empty() || email.is_empty() || message.is_empty() {
            return Err(DispatchError::Validation);
        }

        let from = self
            .from_address
            .clone()
            .unwrap_or_else(|| format!("noreply@{request_host}"));
        let mail = OutgoingMail {
            to: self.to_address.clone(),
            from,
            reply_to: email.to_string(),
            // Header field, not HTML: the name goes in unescaped.
            subject: format!("New Website Inquiry from {name}"),
            text: render_text(name, email, &message),
            html: render_html(name, email, &message),
        };

        log::debug!("dispatching inquiry from {email}");
        if let Err(e) = self.transport.send(&mail).await {
            log::error!("email send failed: {e}");
            return Err(DispatchError::Transport(e));
        }
        log::info!("inquiry from {email} forwarded to {}", self.to_address);
        Ok(())
    }
}
