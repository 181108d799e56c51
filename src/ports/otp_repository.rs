//! OTP token repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::otp::{OtpCode, OtpToken};

/// Storage for email verification codes.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Delete every unused token for `token.email` and insert `token`, in
    /// one transaction. Afterwards `token` is the only live code.
    async fn replace_for_email(&self, token: &OtpToken) -> Result<(), DomainError>;

    /// Atomically mark the matching live token used.
    ///
    /// Returns true only if a token for `email` with `code`, unused and
    /// expiring after `now`, existed and was flipped by this call. Misses
    /// leave every token untouched.
    async fn consume(&self, email: &str, code: &OtpCode, now: Timestamp)
        -> Result<bool, DomainError>;
}
