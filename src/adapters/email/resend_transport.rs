//! Resend mail API transport.
//!
//! Sends rendered messages with `POST {base}/emails`. Attachments are
//! base64-encoded as the API expects.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::ports::{MailError, MailTransport, OutboundEmail};

/// Resend client configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    from_header: String,
    api_base_url: String,
    timeout: Duration,
}

impl ResendConfig {
    pub fn new(api_key: SecretString, from_header: impl Into<String>) -> Self {
        Self {
            api_key,
            from_header: from_header.into(),
            api_base_url: "https://api.resend.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ResendMailTransport {
    config: ResendConfig,
    http_client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ResendMessage<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachments: Vec<ResendAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct ResendAttachment<'a> {
    filename: &'a str,
    content: String,
    content_type: &'a str,
}

impl<'a> ResendMessage<'a> {
    fn from_email(from: &'a str, email: &'a OutboundEmail) -> Self {
        Self {
            from,
            to: [email.to.as_str()],
            subject: &email.subject,
            html: &email.html_body,
            text: &email.text_body,
            attachments: email
                .attachments
                .iter()
                .map(|a| ResendAttachment {
                    filename: &a.filename,
                    content: BASE64.encode(&a.content),
                    content_type: &a.content_type,
                })
                .collect(),
        }
    }
}

impl ResendMailTransport {
    pub fn new(config: ResendConfig) -> Result<Self, MailError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| MailError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    async fn send_once(&self, message: &ResendMessage<'_>) -> Result<(), MailError> {
        let url = format!("{}/emails", self.config.api_base_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MailError::Timeout(e.to_string())
                } else {
                    MailError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MailTransport for ResendMailTransport {
    async fn send(&self, email: &OutboundEmail) -> Result<(), MailError> {
        let message = ResendMessage::from_email(&self.config.from_header, email);
        match self.send_once(&message).await {
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, subject = %email.subject, "Retrying mail send once");
                self.send_once(&message).await
            }
            result => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::EmailAttachment;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn email() -> OutboundEmail {
        OutboundEmail::new("owner@cafe.in", "Report", "<p>hi</p>", "hi").with_attachment(
            EmailAttachment {
                filename: "report.csv".to_string(),
                content_type: "text/csv".to_string(),
                content: b"a,b\n".to_vec(),
            },
        )
    }

    #[test]
    fn message_encodes_attachments_as_base64() {
        let email = email();
        let message = ResendMessage::from_email("Tableside <noreply@tableside.app>", &email);
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["to"][0], "owner@cafe.in");
        assert_eq!(json["from"], "Tableside <noreply@tableside.app>");
        assert_eq!(json["attachments"][0]["content"], "YSxiCg==");
    }

    #[test]
    fn message_without_attachments_omits_field() {
        let email = OutboundEmail::new("a@b.c", "s", "h", "t");
        let json = serde_json::to_value(ResendMessage::from_email("f", &email)).unwrap();
        assert!(json.get("attachments").is_none());
    }

    fn transport(base_url: &str) -> ResendMailTransport {
        let config = ResendConfig::new(SecretString::new("re_test".to_string()), "f <f@x.io>")
            .with_base_url(base_url)
            .with_timeout(Duration::from_millis(500));
        ResendMailTransport::new(config).unwrap()
    }

    #[tokio::test]
    async fn accepted_message_is_sent_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .and(header("authorization", "Bearer re_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "em_1"})))
            .expect(1)
            .mount(&server)
            .await;

        transport(&server.uri()).send(&email()).await.unwrap();

        let received = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(body["to"][0], "owner@cafe.in");
        assert_eq!(body["attachments"][0]["filename"], "report.csv");
    }

    #[tokio::test]
    async fn rejection_is_permanent_and_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(422).set_body_string("invalid from"))
            .expect(1)
            .mount(&server)
            .await;

        let err = transport(&server.uri()).send(&email()).await.unwrap_err();

        assert_eq!(
            err,
            MailError::Rejected { status: 422, message: "invalid from".to_string() }
        );
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn timeout_is_retried_exactly_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/emails"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(2)
            .mount(&server)
            .await;

        let err = transport(&server.uri()).send(&email()).await.unwrap_err();
        assert!(err.is_transient());
        server.verify().await;
    }

    #[tokio::test]
    async fn unreachable_api_is_transient() {
        // Bound then released, so nothing listens there.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = transport(&base).send(&email()).await.unwrap_err();
        assert!(err.is_transient());
    }
}
