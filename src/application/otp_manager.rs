//! OTP manager: issues and checks email verification codes.
//!
//! Issuing replaces every earlier code for the address. A code is stored
//! before delivery is attempted, so a mail outage degrades to `NotSent`
//! instead of blocking the caller.

use std::sync::Arc;

use crate::domain::otp::{OtpCode, OtpDelivery, OtpToken, OtpVerification};
use crate::domain::subscription::{normalize_email, SubscriptionError};
use crate::ports::{Clock, OtpRepository};

use super::NotificationDispatcher;

/// Default code lifetime.
pub const DEFAULT_OTP_TTL_MINUTES: i64 = 10;

pub struct OtpManager {
    tokens: Arc<dyn OtpRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    ttl_minutes: i64,
}

impl OtpManager {
    pub fn new(
        tokens: Arc<dyn OtpRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        ttl_minutes: i64,
    ) -> Self {
        Self {
            tokens,
            dispatcher,
            clock,
            ttl_minutes,
        }
    }

    /// Stores a fresh code for `email` and tries to mail it.
    ///
    /// # Errors
    ///
    /// Only storage failures are errors. Delivery failures return `NotSent`.
    pub async fn generate_and_send(&self, email: &str) -> Result<OtpDelivery, SubscriptionError> {
        let email = normalize_email(email);
        if email.is_empty() || !email.contains('@') {
            return Err(SubscriptionError::invalid_input("A valid email address is required"));
        }

        let token = OtpToken::issue(&email, OtpCode::generate(), self.ttl_minutes, self.clock.now());
        self.tokens.replace_for_email(&token).await?;

        match self
            .dispatcher
            .send_otp(&email, &token.code, self.ttl_minutes)
            .await
        {
            Ok(()) => Ok(OtpDelivery::Sent),
            Err(e) => {
                tracing::warn!(to = %email, error = %e, "Verification code stored but not delivered");
                Ok(OtpDelivery::NotSent)
            }
        }
    }

    /// Consumes the code if it matches the live token for `email`.
    /// Malformed input is simply `Invalid`; a failed attempt leaves the
    /// token usable until it expires.
    pub async fn verify(&self, email: &str, code: &str) -> Result<OtpVerification, SubscriptionError> {
        let code = match OtpCode::parse(code) {
            Ok(code) => code,
            Err(_) => return Ok(OtpVerification::Invalid),
        };

        let consumed = self
            .tokens
            .consume(&normalize_email(email), &code, self.clock.now())
            .await?;

        Ok(if consumed {
            OtpVerification::Valid
        } else {
            OtpVerification::Invalid
        })
    }
}
