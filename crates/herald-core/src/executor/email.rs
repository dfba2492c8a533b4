//! ============================================================================
//! Email Executor - Plain-text Mail over SMTP
//! ============================================================================
//! Sends generated emails through an SMTP relay with implicit TLS
//! (Gmail with an app password by default).
//! ============================================================================

use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{error, info};

use crate::config::SmtpConfig;
use crate::error::{HeraldError, Result};
use crate::types::{EmailDraft, Platform, PostReceipt};

/// Executor for email operations via SMTP
pub struct EmailExecutor {
    host: String,
    port: u16,
    credentials: Credentials,
    from: Mailbox,
}

impl EmailExecutor {
    /// Build from config; the SMTP username doubles as the sender address
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let (username, password) = match (&config.username, &config.password) {
            (Some(u), Some(p)) => (u.clone(), p.clone()),
            _ => {
                return Err(HeraldError::Config(
                    "GMAIL_MAIL and GMAIL_APP_PASSWORD must be set to send email".to_string(),
                ))
            }
        };

        let from: Mailbox = match &config.from_name {
            Some(name) => format!("{} <{}>", name, username).parse::<Mailbox>(),
            None => username.parse::<Mailbox>(),
        }
        .map_err(|e| HeraldError::Config(format!("Invalid sender address '{}': {}", username, e)))?;

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            credentials: Credentials::new(username, password),
            from,
        })
    }

    /// Assemble the MIME message without sending it
    pub fn build_message(&self, draft: &EmailDraft) -> Result<Message> {
        let to: Mailbox = draft.recipient.trim().parse().map_err(|e| {
            HeraldError::Validation(format!("Invalid recipient '{}': {}", draft.recipient, e))
        })?;
        if draft.subject.trim().is_empty() {
            return Err(HeraldError::Validation("Email subject cannot be empty".to_string()));
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(draft.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(draft.body.clone())
            .map_err(|e| HeraldError::Validation(format!("Failed to build email: {}", e)))
    }

    /// Send a single email
    pub async fn send(&self, draft: &EmailDraft) -> Result<PostReceipt> {
        let message = self.build_message(draft)?;
        info!("Sending email to {}: {}", draft.recipient, draft.subject);

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&self.host)
            .map_err(|e| HeraldError::Config(format!("SMTP relay error: {}", e)))?
            .port(self.port)
            .credentials(self.credentials.clone())
            .build();

        match mailer.send(message).await {
            Ok(response) => {
                let id = response.message().collect::<Vec<_>>().join(" ");
                info!("Email sent: {}", id);
                Ok(PostReceipt {
                    platform: Platform::Email,
                    id,
                    url: None,
                })
            }
            Err(e) => {
                error!("SMTP send failed: {}", e);
                Err(HeraldError::VendorPostFailed {
                    platform: Platform::Email,
                    status: e.status().and_then(|code| code.to_string().parse().ok()),
                    body: e.to_string(),
                })
            }
        }
    }
}
