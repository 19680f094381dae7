//! # Mail transports
//!
//! SMTP delivery through lettre, and an in-memory transport for tests and dry runs.

use std::collections::HashSet;
use std::sync::RwLock;

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport as LettreSmtpTransport, Transport,
};

use crate::config::toml_config::SmtpConfig;
use crate::domain::ports::{EmailMessage, MailTransport};
use crate::utils::error::{ClosureError, Result};

/// Records every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: RwLock<Vec<EmailMessage>>,
    failing: HashSet<String>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send addressed to `address` fail.
    pub fn failing_for(mut self, address: impl Into<String>) -> Self {
        self.failing.insert(address.into());
        self
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .read()
            .map(|sent| sent.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent().len()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.write() {
            sent.clear();
        }
    }
}

impl MailTransport for RecordingTransport {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        if let Some(address) = message.to.iter().find(|a| self.failing.contains(*a)) {
            return Err(ClosureError::transport(address.clone(), "rejected by test transport"));
        }
        let mut sent = self
            .sent
            .write()
            .map_err(|_| ClosureError::transport(message.to.join(", "), "recorder lock poisoned"))?;
        sent.push(message.clone());
        Ok(())
    }
}

/// SMTP delivery.
pub struct SmtpTransport {
    mailer: LettreSmtpTransport,
    default_from: String,
}

impl SmtpTransport {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mailer = if config.user.is_empty() {
            // Local relays without authentication
            LettreSmtpTransport::builder_dangerous(&config.host)
                .port(config.port)
                .build()
        } else {
            let creds = Credentials::new(config.user.clone(), config.password.clone());
            LettreSmtpTransport::relay(&config.host)
                .map_err(|e| ClosureError::ConfigError {
                    message: format!("SMTP relay error: {}", e),
                })?
                .credentials(creds)
                .port(config.port)
                .build()
        };

        Ok(Self {
            mailer,
            default_from: config.default_from.clone(),
        })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message> {
        let recipients = message.to.join(", ");
        let mailbox = |address: &str| -> Result<Mailbox> {
            address.trim().parse::<Mailbox>().map_err(|e| {
                ClosureError::transport(recipients.clone(), format!("invalid address {}: {}", address, e))
            })
        };

        let from = message.from.as_deref().unwrap_or(&self.default_from);
        let mut builder = Message::builder()
            .from(mailbox(from)?)
            .subject(message.subject.clone())
            .header(if message.html {
                ContentType::TEXT_HTML
            } else {
                ContentType::TEXT_PLAIN
            });
        for to in &message.to {
            builder = builder.to(mailbox(to.as_str())?);
        }
        for bcc in &message.bcc {
            builder = builder.bcc(mailbox(bcc.as_str())?);
        }

        builder.body(message.body.clone()).map_err(|e| {
            ClosureError::transport(recipients.clone(), format!("failed to build email: {}", e))
        })
    }
}

impl MailTransport for SmtpTransport {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        let email = self.build_message(message)?;
        self.mailer
            .send(&email)
            .map_err(|e| ClosureError::transport(message.to.join(", "), e.to_string()))?;
        Ok(())
    }
}
