//! Outbound mail delivery
//!
//! The dispatch service talks to a [`MailTransport`]; production uses the
//! SMTP relay, tests use [`MockTransport`].

pub mod mock;
pub mod smtp;

pub use mock::MockTransport;
pub use smtp::SmtpRelay;

use crate::error::Result;
use async_trait::async_trait;
use tracing::{error, info};

/// Attachment handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingAttachment {
    pub filename: String,
    pub content_type: String,
    /// Decoded body; `None` when the caller only sent metadata
    pub content: Option<Vec<u8>>,
}

/// Fully validated message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub from: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<OutgoingAttachment>,
}

impl OutgoingMessage {
    /// Every envelope recipient: to, cc and bcc
    pub fn recipients(&self) -> impl Iterator<Item = &String> {
        self.to.iter().chain(self.cc.iter()).chain(self.bcc.iter())
    }
}

/// Something that can hand a message to a mail relay
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver the message and return the message id it was sent with.
    /// Failures are reported as `MailerError::Transport`.
    async fn send(&self, message: &OutgoingMessage) -> Result<String>;

    /// Check that the relay is reachable
    async fn verify(&self) -> Result<()>;
}

/// Startup reachability check; an unreachable relay aborts startup
pub async fn verify_relay(transport: &dyn MailTransport) -> Result<()> {
    match transport.verify().await {
        Ok(()) => {
            info!("SMTP relay reachable");
            Ok(())
        }
        Err(e) => {
            error!("SMTP relay check failed: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MailerError;

    #[tokio::test]
    async fn test_verify_relay_propagates_failure() {
        let transport = MockTransport::failing("connection refused");
        let err = verify_relay(&transport).await.unwrap_err();
        assert!(matches!(err, MailerError::Transport(ref m) if m == "connection refused"));

        transport.set_failure(None).await;
        assert!(verify_relay(&transport).await.is_ok());
    }
}
