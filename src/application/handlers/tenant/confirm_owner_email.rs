//! ConfirmOwnerEmailHandler - Marks an owner's email verified with a code.

use std::sync::Arc;

use crate::application::OtpManager;
use crate::domain::otp::OtpVerification;
use crate::domain::subscription::SubscriptionError;
use crate::ports::TenantRepository;

#[derive(Debug, Clone)]
pub struct ConfirmOwnerEmailCommand {
    pub email: String,
    pub code: String,
}

pub struct ConfirmOwnerEmailHandler {
    tenants: Arc<dyn TenantRepository>,
    otp: Arc<OtpManager>,
}

impl ConfirmOwnerEmailHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, otp: Arc<OtpManager>) -> Self {
        Self { tenants, otp }
    }

    /// Returns `Invalid` for a wrong or expired code without touching the
    /// tenant.
    pub async fn handle(
        &self,
        cmd: ConfirmOwnerEmailCommand,
    ) -> Result<OtpVerification, SubscriptionError> {
        let verification = self.otp.verify(&cmd.email, &cmd.code).await?;
        if !verification.is_valid() {
            return Ok(verification);
        }

        if !self.tenants.mark_email_verified(&cmd.email).await? {
            return Err(SubscriptionError::not_found(format!(
                "Tenant with owner email {}",
                cmd.email.trim()
            )));
        }
        tracing::info!(email = %cmd.email.trim(), "Owner email verified");
        Ok(verification)
    }
}
