//! Mail transport that keeps messages in memory.
//!
//! Used when no mail API key is configured and in tests. Can be told to
//! fail for specific recipients.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::ports::{MailError, MailTransport, OutboundEmail};

/// Records every accepted message. Clones share state.
#[derive(Clone, Default)]
pub struct RecordingMailTransport {
    inner: Arc<Mutex<Recorded>>,
}

#[derive(Default)]
struct Recorded {
    sent: Vec<OutboundEmail>,
    failing_recipients: HashSet<String>,
    fail_all: bool,
}

impl RecordingMailTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport that rejects everything, for delivery-failure tests.
    pub fn failing() -> Self {
        let transport = Self::new();
        transport.lock().fail_all = true;
        transport
    }

    pub fn fail_for(&self, recipient: &str) {
        self.lock().failing_recipients.insert(recipient.to_string());
    }

    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.lock().sent.clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<OutboundEmail> {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.to == recipient)
            .cloned()
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl MailTransport for RecordingMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let mut recorded = self.lock();
        if recorded.fail_all || recorded.failing_recipients.contains(&email.to) {
            return Err(MailError::Network(format!("delivery to {} failed", email.to)));
        }
        tracing::debug!(to = %email.to, subject = %email.subject, "Recorded outbound email");
        recorded.sent.push(email.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_and_filters_by_recipient() {
        let transport = RecordingMailTransport::new();
        transport.send(&OutboundEmail::new("a@x.io", "1", "", "")).await.unwrap();
        transport.send(&OutboundEmail::new("b@x.io", "2", "", "")).await.unwrap();

        assert_eq!(transport.sent().len(), 2);
        assert_eq!(transport.sent_to("b@x.io")[0].subject, "2");
    }

    #[tokio::test]
    async fn failing_recipient_is_not_recorded() {
        let transport = RecordingMailTransport::new();
        transport.fail_for("bad@x.io");
        assert!(transport
            .send(&OutboundEmail::new("bad@x.io", "s", "", ""))
            .await
            .is_err());
        assert!(transport.sent().is_empty());
    }
}
