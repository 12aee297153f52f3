//! Failure notification over SMTP
//!
//! The bridge reports store failures here with the raw error detail; the
//! bus only ever sees an opaque error status. Sending is fire-and-forget:
//! a failed send is logged and swallowed, never surfaced to a workflow.

use async_trait::async_trait;
use lettre::{
    message::Mailbox,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};

use crate::config::EmailConfig;

/// Notification collaborator consumed by the bridge and the HTTP layer
#[async_trait]
pub trait FailureNotifier: Send + Sync {
    /// Report a failure with raw error detail. No return value: the caller
    /// has nothing useful to do with a notification error.
    async fn notify_failure(&self, reason: &str);
}

/// Email error
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email service not configured")]
    NotConfigured,

    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Send error: {0}")]
    SendError(String),
}

/// SMTP notifier. When no SMTP host is configured all sends become no-ops,
/// so the service runs fine without email in development.
#[derive(Clone)]
pub struct EmailNotifier {
    config: Option<EmailConfig>,
}

impl std::fmt::Debug for EmailNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailNotifier")
            .field("configured", &self.config.is_some())
            .finish()
    }
}

impl EmailNotifier {
    #[must_use]
    pub const fn new(config: Option<EmailConfig>) -> Self {
        Self { config }
    }

    /// Announce successful startup of the service
    pub async fn notify_startup(&self) {
        if let Err(e) = self
            .send("Groupkeys service is up", "Groupkeys service is up")
            .await
        {
            if !matches!(e, EmailError::NotConfigured) {
                warn!(error = %e, "Failed to send startup notification");
            }
        }
    }

    async fn send(&self, subject: &str, body: &str) -> Result<(), EmailError> {
        let Some(config) = &self.config else {
            return Err(EmailError::NotConfigured);
        };

        let from_mailbox: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("from address: {e}")))?;
        let to_mailbox: Mailbox = config
            .notify_email
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("to address: {e}")))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| EmailError::SendError(format!("Failed to build email: {e}")))?;

        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());
        let transport = if config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
                .map_err(|e| EmailError::SendError(format!("Failed to create SMTP transport: {e}")))?
                .credentials(creds)
                .port(config.smtp_port)
                .build()
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .credentials(creds)
                .port(config.smtp_port)
                .build()
        };

        transport
            .send(email)
            .await
            .map_err(|e| EmailError::SendError(format!("Failed to send email: {e}")))?;

        debug!(
            "Notification sent to {} via SMTP {}:{}",
            config.notify_email, config.smtp_host, config.smtp_port
        );

        Ok(())
    }
}

#[async_trait]
impl FailureNotifier for EmailNotifier {
    async fn notify_failure(&self, reason: &str) {
        let body = format!("The following error has been generated:\n\n{reason}");
        match self.send("Groupkeys service error", &body).await {
            Ok(()) => {}
            Err(EmailError::NotConfigured) => {
                debug!(reason, "Email not configured, dropping failure notification");
            }
            Err(e) => {
                warn!(error = %e, reason, "Failed to send failure notification");
            }
        }
    }
}
