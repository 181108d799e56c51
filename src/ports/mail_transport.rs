//! Outbound mail port.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode};

/// A rendered email ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    pub attachments: Vec<EmailAttachment>,
}

impl OutboundEmail {
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
        text_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
            text_body: text_body.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, attachment: EmailAttachment) -> Self {
        self.attachments.push(attachment);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Mail delivery failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MailError {
    #[error("Mail transport timed out: {0}")]
    Timeout(String),

    #[error("Mail transport unreachable: {0}")]
    Network(String),

    #[error("Mail provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl MailError {
    pub fn is_transient(&self) -> bool {
        matches!(self, MailError::Timeout(_) | MailError::Network(_))
    }
}

impl From<MailError> for DomainError {
    fn from(err: MailError) -> Self {
        DomainError::new(ErrorCode::ExternalServiceError, err.to_string())
    }
}

/// Sends rendered emails. `Ok` means the provider accepted the message.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError>;
}
