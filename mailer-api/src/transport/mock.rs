//! In-memory transport for tests

use super::{MailTransport, OutgoingMessage};
use crate::error::{MailerError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

/// Records every message instead of delivering it
#[derive(Default)]
pub struct MockTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail: AtomicBool,
    failure_message: Mutex<String>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
            failure_message: Mutex::new(message.into()),
        }
    }

    /// Toggle failure mode at runtime
    pub async fn set_failure(&self, message: Option<String>) {
        match message {
            Some(message) => {
                *self.failure_message.lock().await = message;
                self.fail.store(true, Ordering::SeqCst);
            }
            None => self.fail.store(false, Ordering::SeqCst),
        }
    }

    /// Messages accepted so far
    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailerError::Transport(self.failure_message.lock().await.clone()));
        }

        let message_id = format!("<{}@mock.local>", Uuid::new_v4());
        self.sent.lock().await.push(message.clone());
        Ok(message_id)
    }

    async fn verify(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailerError::Transport(self.failure_message.lock().await.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "noreply@example.com".to_string(),
            to: vec!["a@example.com".to_string()],
            cc: vec![],
            bcc: vec![],
            subject: "Hi".to_string(),
            text: Some("Hello".to_string()),
            html: None,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn test_mock_records_messages() {
        let transport = MockTransport::new();
        let id = transport.send(&message()).await.unwrap();

        assert!(id.starts_with('<') && id.ends_with("@mock.local>"));
        assert_eq!(transport.sent_count().await, 1);
        assert_eq!(transport.sent().await[0].subject, "Hi");
    }

    #[tokio::test]
    async fn test_mock_failure_toggle() {
        let transport = MockTransport::failing("relay down");
        let err = transport.send(&message()).await.unwrap_err();
        assert!(matches!(err, MailerError::Transport(ref m) if m == "relay down"));
        assert_eq!(transport.sent_count().await, 0);

        transport.set_failure(None).await;
        assert!(transport.send(&message()).await.is_ok());
    }
}
