//! SMTP delivery of the daily digest.

use anyhow::Result;
use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::config::Config;
use crate::error::DeliveryError;

/// Capability interface over the outbound mail transport. One message per
/// call; session lifetime is scoped to the call.
#[async_trait]
pub trait DigestTransport: Send + Sync {
    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}

pub struct SmtpSender {
    host: String,
    port: u16,
    username: String,
    password: String,
    from_email: String,
    to_email: String,
}

impl SmtpSender {
    pub fn new(config: &Config) -> Self {
        Self {
            host: config.smtp_server.clone(),
            port: config.smtp_port,
            username: config.email_username.clone(),
            password: config.email_password.clone(),
            from_email: config.email_username.clone(),
            to_email: config.to_email.clone(),
        }
    }

    /// Open a STARTTLS session, authenticate, send one plain-text message.
    /// The transport is dropped when this returns, closing the session.
    async fn deliver(&self, subject: &str, body: &str) -> Result<(), DeliveryError> {
        let from: Mailbox = self.from_email.parse()?;
        let to: Mailbox = self.to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())?;

        let creds = Credentials::new(self.username.clone(), self.password.clone());
        let mailer: AsyncSmtpTransport<Tokio1Executor> =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
                .port(self.port)
                .credentials(creds)
                .build();

        mailer.send(email).await?;

        tracing::info!(to = %self.to_email, subject, "Digest email sent successfully");

        Ok(())
    }
}

#[async_trait]
impl DigestTransport for SmtpSender {
    async fn send(&self, subject: &str, body: &str) -> Result<()> {
        self.deliver(subject, body).await.map_err(Into::into)
    }
}
