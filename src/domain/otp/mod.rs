//! Email verification codes.
//!
//! One-time 6-digit numeric codes with a short expiry. Issuing a new code
//! for an email invalidates every earlier unused code for it.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{OtpTokenId, Timestamp, ValidationError};

/// Number of digits in a code.
pub const OTP_LENGTH: usize = 6;

/// A 6-digit numeric code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OtpCode(String);

impl OtpCode {
    /// Draws each digit uniformly at random.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self(
            (0..OTP_LENGTH)
                .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
                .collect(),
        )
    }

    /// Validates user input. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let code = raw.trim();
        if code.is_empty() {
            return Err(ValidationError::empty_field("code"));
        }
        if code.len() != OTP_LENGTH || !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid_format(
                "code",
                format!("expected {} digits", OTP_LENGTH),
            ));
        }
        Ok(Self(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OtpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for OtpCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OtpCode::parse(&value)
    }
}

impl From<OtpCode> for String {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}

/// Stored verification code for one email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpToken {
    pub id: OtpTokenId,
    pub email: String,
    pub code: OtpCode,
    pub expires_at: Timestamp,
    pub used: bool,
    pub created_at: Timestamp,
}

impl OtpToken {
    pub fn issue(email: &str, code: OtpCode, ttl_minutes: i64, now: Timestamp) -> Self {
        Self {
            id: OtpTokenId::new(),
            email: crate::domain::subscription::normalize_email(email),
            code,
            expires_at: now.add_minutes(ttl_minutes),
            used: false,
            created_at: now,
        }
    }

    /// True if `code` matches and the token is unused and unexpired at `now`.
    pub fn accepts(&self, code: &OtpCode, now: Timestamp) -> bool {
        !self.used && now < self.expires_at && self.code == *code
    }
}

/// Result of checking a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpVerification {
    Valid,
    Invalid,
}

impl OtpVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, OtpVerification::Valid)
    }
}

/// Whether an issued code reached the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpDelivery {
    Sent,
    /// Code is stored but no email went out.
    NotSent,
}
