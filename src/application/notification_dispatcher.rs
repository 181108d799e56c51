//! Notification dispatcher.
//!
//! Renders and sends verification codes and daily owner reports through
//! the mail transport. Mail is optional: without a transport, codes are
//! reported as undelivered and reports are skipped.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::otp::OtpCode;
use crate::domain::reporting::DailyReport;
use crate::domain::subscription::{SubscriptionError, Tenant};
use crate::ports::{Clock, EmailAttachment, MailError, MailTransport, OrderReader, OutboundEmail, TenantRepository};

/// Why a message did not go out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("Mail transport is not configured")]
    NotConfigured,

    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Tally of one report run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReportRunSummary {
    pub sent: u64,
    pub failed: u64,
    /// Deactivated tenants, or every tenant when mail is unconfigured.
    pub skipped: u64,
}

pub struct NotificationDispatcher {
    tenants: Arc<dyn TenantRepository>,
    orders: Arc<dyn OrderReader>,
    mail: Option<Arc<dyn MailTransport>>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        orders: Arc<dyn OrderReader>,
        mail: Option<Arc<dyn MailTransport>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants,
            orders,
            mail,
            clock,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.mail.is_some()
    }

    /// Sends a verification code.
    pub async fn send_otp(
        &self,
        email: &str,
        code: &OtpCode,
        ttl_minutes: i64,
    ) -> Result<(), DispatchError> {
        let mail = self.mail.as_ref().ok_or(DispatchError::NotConfigured)?;
        mail.send(&otp_email(email, code, ttl_minutes)).await?;
        tracing::info!(to = %email, "Verification code sent");
        Ok(())
    }

    /// Sends every active tenant with an owner email its 24-hour report.
    /// One tenant's failure is logged and the run continues.
    pub async fn send_daily_reports(&self) -> Result<ReportRunSummary, SubscriptionError> {
        let tenants = self.tenants.list_with_owner_email().await?;
        let mut summary = ReportRunSummary::default();

        let mail = match &self.mail {
            Some(mail) => mail,
            None => {
                summary.skipped = tenants.len() as u64;
                tracing::warn!(tenants = summary.skipped, "Mail not configured, skipping daily reports");
                return Ok(summary);
            }
        };

        let now = self.clock.now();
        for tenant in &tenants {
            if !tenant.is_active {
                summary.skipped += 1;
                continue;
            }
            match self.send_report(mail.as_ref(), tenant, now).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        tenant_id = %tenant.id,
                        slug = %tenant.slug,
                        error = %e,
                        "Daily report failed"
                    );
                }
            }
        }

        tracing::info!(
            sent = summary.sent,
            failed = summary.failed,
            skipped = summary.skipped,
            "Daily report run finished"
        );
        Ok(summary)
    }

    async fn send_report(
        &self,
        mail: &dyn MailTransport,
        tenant: &Tenant,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let orders = self
            .orders
            .orders_between(&tenant.id, now.minus_days(1), now)
            .await?;
        let report = DailyReport::new(tenant.id, tenant.name.clone(), now, orders);

        let email = OutboundEmail::new(
            tenant.owner_email.clone(),
            report.subject(),
            report.render_html(),
            report.render_text(),
        )
        .with_attachment(EmailAttachment {
            filename: report.attachment_filename(),
            content_type: "text/csv".to_string(),
            content: report.render_csv().into_bytes(),
        });

        mail.send(&email).await?;
        tracing::debug!(tenant_id = %tenant.id, orders = report.summary.order_count, "Daily report sent");
        Ok(())
    }
}

fn otp_email(to: &str, code: &OtpCode, ttl_minutes: i64) -> OutboundEmail {
    let text = format!(
        "Your OTP Code: {code}\n\n\
         This OTP will expire in {ttl} minutes.\n\n\
         If you did not request this code, please ignore this email.\n\
         Do not share this OTP with anyone.\n",
        code = code,
        ttl = ttl_minutes
    );
    let html = format!(
        "<p>Your verification code is:</p>\
         <p style=\"font-size:28px;letter-spacing:6px;font-weight:bold\">{code}</p>\
         <p>This code expires in {ttl} minutes.</p>\
         <p>If you did not request this code, please ignore this email. \
         Do not share it with anyone.</p>",
        code = code,
        ttl = ttl_minutes
    );
    OutboundEmail::new(to, format!("Your OTP Code: {}", code), html, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock, RecordingMailTransport};
    use crate::domain::subscription::Slug;

    struct Fixture {
        store: InMemoryStore,
        mail: RecordingMailTransport,
        clock: ManualClock,
        dispatcher: NotificationDispatcher,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let mail = RecordingMailTransport::new();
        let clock = ManualClock::new(Timestamp::now());
        let dispatcher = NotificationDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Some(Arc::new(mail.clone())),
            Arc::new(clock.clone()),
        );
        Fixture { store, mail, clock, dispatcher }
    }

    fn seed(f: &Fixture, slug: &str) -> Tenant {
        let tenant = Tenant::register(
            format!("Cafe {}", slug),
            Slug::parse(slug).unwrap(),
            &format!("{}@x.com", slug),
            "h",
            7,
            f.clock.now(),
        );
        f.store.seed_tenant(tenant.clone());
        tenant
    }

    #[tokio::test]
    async fn otp_email_carries_code_and_expiry() {
        let f = fixture();
        let code = OtpCode::parse("123456").unwrap();
        f.dispatcher.send_otp("a@x.com", &code, 10).await.unwrap();

        let sent = f.mail.sent_to("a@x.com");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Your OTP Code: 123456");
        assert!(sent[0].text_body.contains("10 minutes"));
    }

    #[tokio::test]
    async fn unconfigured_mail_reports_not_configured() {
        let store = InMemoryStore::new();
        let dispatcher = NotificationDispatcher::new(
            Arc::new(store.clone()),
            Arc::new(store),
            None,
            Arc::new(ManualClock::new(Timestamp::now())),
        );
        let code = OtpCode::generate();
        assert_eq!(
            dispatcher.send_otp("a@x.com", &code, 10).await,
            Err(DispatchError::NotConfigured)
        );
    }

    #[tokio::test]
    async fn report_covers_last_24_hours_only() {
        let f = fixture();
        let tenant = seed(&f, "cafe-one");
        let now = f.clock.now();
        f.store.add_order(tenant.id, 50_000, now.minus_secs(3600));
        f.store.add_order(tenant.id, 30_000, now.minus_days(2));

        let summary = f.dispatcher.send_daily_reports().await.unwrap();
        assert_eq!(summary.sent, 1);

        let sent = f.mail.sent_to("cafe-one@x.com");
        assert!(sent[0].subject.starts_with("24-Hour Report - Cafe cafe-one"));
        assert!(sent[0].text_body.contains("Orders: 1"));
        assert_eq!(sent[0].attachments.len(), 1);
        assert!(sent[0].attachments[0].filename.ends_with(".csv"));
    }

    #[tokio::test]
    async fn one_failed_recipient_does_not_stop_the_run() {
        let f = fixture();
        seed(&f, "cafe-one");
        seed(&f, "cafe-two");
        let mut inactive = seed(&f, "cafe-three");
        inactive.is_active = false;
        f.store.seed_tenant(inactive);
        f.mail.fail_for("cafe-one@x.com");

        let summary = f.dispatcher.send_daily_reports().await.unwrap();

        assert_eq!(summary, ReportRunSummary { sent: 1, failed: 1, skipped: 1 });
        assert_eq!(f.mail.sent_to("cafe-two@x.com").len(), 1);
    }
}
