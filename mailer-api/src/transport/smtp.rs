//! SMTP relay delivery via lettre

use super::{MailTransport, OutgoingMessage};
use crate::config::{SmtpConfig, TlsMode};
use crate::error::{MailerError, Result};
use crate::utils::email::domain_of;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParametersBuilder};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Sends through a configured upstream SMTP server
pub struct SmtpRelay {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    host: String,
}

impl SmtpRelay {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
            .port(config.port)
            .timeout(Some(Duration::from_secs(config.timeout_seconds)));

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            if !username.is_empty() {
                builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
        }

        builder = match config.tls {
            TlsMode::None => builder,
            TlsMode::Starttls => builder.tls(Tls::Required(tls_parameters(config)?)),
            TlsMode::Tls => builder.tls(Tls::Wrapper(tls_parameters(config)?)),
        };

        info!(
            "SMTP relay configured: {}:{} (tls: {:?})",
            config.host, config.port, config.tls
        );

        Ok(Self {
            mailer: builder.build(),
            host: config.host.clone(),
        })
    }
}

fn tls_parameters(config: &SmtpConfig) -> Result<lettre::transport::smtp::client::TlsParameters> {
    TlsParametersBuilder::new(config.host.clone())
        .dangerous_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(|e| MailerError::Config(format!("Invalid SMTP TLS settings: {}", e)))
}

fn mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse::<Mailbox>()
        .map_err(|e| MailerError::Transport(format!("Invalid address '{}': {}", address, e)))
}

/// `<uuid@domain>` using the sender's domain
fn generate_message_id(from: &str) -> String {
    format!("<{}@{}>", Uuid::new_v4(), domain_of(from).unwrap_or("localhost"))
}

enum Body {
    Single(SinglePart),
    Alternative(MultiPart),
}

/// Build the MIME message. Attachments without content are not part of the body.
pub(crate) fn build_message(message: &OutgoingMessage, message_id: &str) -> Result<Message> {
    let mut builder = Message::builder()
        .from(mailbox(&message.from)?)
        .subject(message.subject.as_str())
        .message_id(Some(message_id.to_string()));

    for address in &message.to {
        builder = builder.to(mailbox(address)?);
    }
    for address in &message.cc {
        builder = builder.cc(mailbox(address)?);
    }
    for address in &message.bcc {
        builder = builder.bcc(mailbox(address)?);
    }

    let body = match (&message.text, &message.html) {
        (Some(text), Some(html)) => {
            Body::Alternative(MultiPart::alternative_plain_html(text.clone(), html.clone()))
        }
        (None, Some(html)) => Body::Single(SinglePart::html(html.clone())),
        (Some(text), None) => Body::Single(SinglePart::plain(text.clone())),
        (None, None) => Body::Single(SinglePart::plain(String::new())),
    };

    let mut files = Vec::new();
    for attachment in &message.attachments {
        let Some(content) = &attachment.content else {
            continue;
        };
        let content_type = ContentType::parse(&attachment.content_type).map_err(|e| {
            MailerError::Transport(format!(
                "Invalid content type '{}': {}",
                attachment.content_type, e
            ))
        })?;
        files.push(Attachment::new(attachment.filename.clone()).body(content.clone(), content_type));
    }

    let built = if files.is_empty() {
        match body {
            Body::Single(part) => builder.singlepart(part),
            Body::Alternative(parts) => builder.multipart(parts),
        }
    } else {
        let mut mixed = match body {
            Body::Single(part) => MultiPart::mixed().singlepart(part),
            Body::Alternative(parts) => MultiPart::mixed().multipart(parts),
        };
        for file in files {
            mixed = mixed.singlepart(file);
        }
        builder.multipart(mixed)
    };

    built.map_err(|e| MailerError::Transport(format!("Failed to build message: {}", e)))
}

#[async_trait]
impl MailTransport for SmtpRelay {
    async fn send(&self, message: &OutgoingMessage) -> Result<String> {
        let message_id = generate_message_id(&message.from);
        let email = build_message(message, &message_id)?;

        let response = self
            .mailer
            .send(email)
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        debug!(
            "Relay {} accepted {}: {}",
            self.host,
            message_id,
            response.message().collect::<Vec<_>>().join(" ")
        );
        Ok(message_id)
    }

    async fn verify(&self) -> Result<()> {
        let reachable = self
            .mailer
            .test_connection()
            .await
            .map_err(|e| MailerError::Transport(e.to_string()))?;

        if !reachable {
            return Err(MailerError::Transport(format!(
                "SMTP server {} refused the connection",
                self.host
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::OutgoingAttachment;

    fn message() -> OutgoingMessage {
        OutgoingMessage {
            from: "Sender <noreply@example.com>".to_string(),
            to: vec!["a@example.com".to_string()],
            cc: vec!["b@example.com".to_string()],
            bcc: vec!["c@example.com".to_string()],
            subject: "Report".to_string(),
            text: Some("plain".to_string()),
            html: Some("<p>html</p>".to_string()),
            attachments: vec![],
        }
    }

    #[test]
    fn test_message_id_uses_sender_domain() {
        let id = generate_message_id("Sender <noreply@example.com>");
        assert!(id.starts_with('<'));
        assert!(id.ends_with("@example.com>"));
    }

    #[test]
    fn test_envelope_includes_all_recipients() {
        let email = build_message(&message(), "<id@example.com>").unwrap();
        let recipients: Vec<String> = email
            .envelope()
            .to()
            .iter()
            .map(|address| address.to_string())
            .collect();

        assert_eq!(recipients.len(), 3);
        assert!(recipients.contains(&"c@example.com".to_string()));

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("<id@example.com>"));
    }

    #[test]
    fn test_attachments_with_content_make_mixed_message() {
        let mut outgoing = message();
        outgoing.attachments = vec![
            OutgoingAttachment {
                filename: "report.txt".to_string(),
                content_type: "text/plain".to_string(),
                content: Some(b"hello".to_vec()),
            },
            OutgoingAttachment {
                filename: "reference.pdf".to_string(),
                content_type: "application/pdf".to_string(),
                content: None,
            },
        ];

        let raw = String::from_utf8(build_message(&outgoing, "<id@example.com>").unwrap().formatted())
            .unwrap();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("report.txt"));
        assert!(!raw.contains("reference.pdf"));
    }

    #[test]
    fn test_invalid_address_is_transport_error() {
        let mut outgoing = message();
        outgoing.to = vec!["not an address".to_string()];

        let err = build_message(&outgoing, "<id@example.com>").unwrap_err();
        assert!(matches!(err, MailerError::Transport(_)));
    }
}
