use crate::db::Page;
use crate::emails::store::EmailStore;
use crate::emails::types::{
    AttachmentInput, AttachmentMeta, EmailRecord, EmailStatus, SendEmailRequest,
    SendTemplatedRequest,
};
use crate::error::{MailerError, Result};
use crate::quota::QuotaTracker;
use crate::templates::TemplateManager;
use crate::transport::{MailTransport, OutgoingAttachment, OutgoingMessage};
use crate::users::User;
use crate::utils::validate_email;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Orchestrates quota, persistence and transport for every send
pub struct DispatchService {
    quota: Arc<QuotaTracker>,
    store: Arc<EmailStore>,
    templates: Arc<TemplateManager>,
    transport: Arc<dyn MailTransport>,
    default_from: String,
}

/// Validated request split into what is sent and what is stored
struct PreparedSend {
    message: OutgoingMessage,
    attachments: Vec<AttachmentMeta>,
}

impl DispatchService {
    pub fn new(
        quota: Arc<QuotaTracker>,
        store: Arc<EmailStore>,
        templates: Arc<TemplateManager>,
        transport: Arc<dyn MailTransport>,
        default_from: impl Into<String>,
    ) -> Self {
        Self {
            quota,
            store,
            templates,
            transport,
            default_from: default_from.into(),
        }
    }

    /// Send a raw message on behalf of `user`.
    ///
    /// Validation and the quota check run before anything is stored. The
    /// record is stored as pending, then moved to sent or failed once the
    /// transport returns. Only a successful send counts against the quota.
    pub async fn send_email(
        &self,
        user: &User,
        request: SendEmailRequest,
        ip_address: Option<String>,
    ) -> Result<EmailRecord> {
        let prepared = prepare(&request, &self.default_from)?;

        let mut user = user.clone();
        let quota = self.quota.ensure_can_send(&mut user, Utc::now()).await?;
        debug!(
            "User {} has {} of {} sends left",
            user.id,
            quota.remaining(),
            quota.limit
        );

        let now = Utc::now();
        let mut record = EmailRecord {
            id: Uuid::new_v4().to_string(),
            user_id: user.id.clone(),
            from: prepared.message.from.clone(),
            to: prepared.message.to.clone(),
            cc: prepared.message.cc.clone(),
            bcc: prepared.message.bcc.clone(),
            subject: prepared.message.subject.clone(),
            text: prepared.message.text.clone(),
            html: prepared.message.html.clone(),
            attachments: prepared.attachments,
            status: EmailStatus::Pending,
            status_message: None,
            message_id: None,
            tags: request.tags,
            metadata: request.metadata,
            ip_address,
            created_at: now,
            updated_at: now,
        };
        self.store.insert(&record).await?;

        match self.transport.send(&prepared.message).await {
            Ok(message_id) => {
                self.store.mark_sent(&record.id, &message_id).await?;
                self.quota.record_send(&user.id).await?;

                info!(
                    "Email sent: {} to {} recipient(s) (message id {}, user {})",
                    record.id,
                    prepared.message.recipients().count(),
                    message_id,
                    user.id
                );
                record.status = EmailStatus::Sent;
                record.message_id = Some(message_id);
                record.updated_at = Utc::now();
                Ok(record)
            }
            Err(err) => {
                let reason = match &err {
                    MailerError::Transport(reason) => reason.clone(),
                    other => other.to_string(),
                };
                warn!("Email {} failed for user {}: {}", record.id, user.id, reason);

                if let Err(mark_err) = self.store.mark_failed(&record.id, &reason).await {
                    error!("Failed to mark email {} as failed: {}", record.id, mark_err);
                }

                Err(match err {
                    MailerError::Transport(_) => err,
                    other => MailerError::Transport(other.to_string()),
                })
            }
        }
    }

    /// Render a readable template and send the result
    pub async fn send_templated(
        &self,
        user: &User,
        request: SendTemplatedRequest,
        ip_address: Option<String>,
    ) -> Result<EmailRecord> {
        if request.template_id.trim().is_empty() {
            return Err(MailerError::Validation("Template ID is required".to_string()));
        }
        if request.to.is_empty() {
            return Err(MailerError::Validation(
                "At least one recipient is required".to_string(),
            ));
        }

        let rendered = self
            .templates
            .render_template(&request.template_id, &user.id, &request.template_data)
            .await?;

        let raw = SendEmailRequest {
            from: request.from,
            to: request.to,
            cc: request.cc,
            bcc: request.bcc,
            subject: rendered.subject,
            text: rendered.text,
            html: Some(rendered.html),
            attachments: request.attachments,
            tags: request.tags,
            metadata: request.metadata,
        };

        self.send_email(user, raw, ip_address).await
    }

    /// A record owned by `user`; other users' records are reported as missing
    pub async fn get_status(&self, id: &str, user: &User) -> Result<EmailRecord> {
        match self.store.get(id).await? {
            Some(record) if record.user_id == user.id => Ok(record),
            _ => Err(MailerError::NotFound("Email not found".to_string())),
        }
    }

    pub async fn get_history(&self, user: &User, page: Page) -> Result<Vec<EmailRecord>> {
        self.store.history(&user.id, page).await
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
}

/// Check the request shape and decode attachments. Touches no state.
fn prepare(request: &SendEmailRequest, default_from: &str) -> Result<PreparedSend> {
    if request.to.is_empty() {
        return Err(MailerError::Validation(
            "At least one recipient is required".to_string(),
        ));
    }
    if request.subject.trim().is_empty() {
        return Err(MailerError::Validation("Subject is required".to_string()));
    }

    let text = non_empty(&request.text);
    let html = non_empty(&request.html);
    if text.is_none() && html.is_none() {
        return Err(MailerError::Validation(
            "Either text or HTML content is required".to_string(),
        ));
    }

    let from = non_empty(&request.from).unwrap_or_else(|| default_from.to_string());
    check_address(&from)?;
    for address in request.to.iter().chain(&request.cc).chain(&request.bcc) {
        check_address(address)?;
    }

    let mut outgoing = Vec::with_capacity(request.attachments.len());
    let mut attachments = Vec::with_capacity(request.attachments.len());
    for input in &request.attachments {
        let (file, meta) = prepare_attachment(input)?;
        outgoing.push(file);
        attachments.push(meta);
    }

    Ok(PreparedSend {
        message: OutgoingMessage {
            from,
            to: request.to.clone(),
            cc: request.cc.clone(),
            bcc: request.bcc.clone(),
            subject: request.subject.clone(),
            text,
            html,
            attachments: outgoing,
        },
        attachments,
    })
}

/// Accept only addresses the relay can also put on the envelope
fn check_address(address: &str) -> Result<()> {
    validate_email(address)?;
    address.parse::<Mailbox>().map_err(|e| {
        MailerError::Validation(format!("Invalid email address '{}': {}", address, e))
    })?;
    Ok(())
}

fn prepare_attachment(input: &AttachmentInput) -> Result<(OutgoingAttachment, AttachmentMeta)> {
    let filename = input.filename.trim();
    if filename.is_empty() {
        return Err(MailerError::Validation(
            "Attachment filename is required".to_string(),
        ));
    }

    let content = match &input.content {
        Some(encoded) => Some(STANDARD.decode(encoded.trim()).map_err(|e| {
            MailerError::Validation(format!(
                "Attachment '{}' is not valid base64: {}",
                filename, e
            ))
        })?),
        None => None,
    };

    let content_type = non_empty(&input.content_type)
        .map(|t| t.trim().to_string())
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
    ContentType::parse(&content_type).map_err(|e| {
        MailerError::Validation(format!(
            "Attachment '{}' has an invalid content type '{}': {}",
            filename, content_type, e
        ))
    })?;
    let size = input
        .size
        .or_else(|| content.as_ref().map(|c| c.len() as u64))
        .unwrap_or(0);

    Ok((
        OutgoingAttachment {
            filename: filename.to_string(),
            content_type: content_type.clone(),
            content,
        },
        AttachmentMeta {
            filename: filename.to_string(),
            content_type,
            size,
        },
    ))
}
