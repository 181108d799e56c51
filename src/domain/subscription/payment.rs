//! Payment signature verification and payment records.
//!
//! The gateway signs `"<order_id>|<payment_id>"` with HMAC-SHA256 using the
//! merchant key secret and sends the lowercase hex digest to the client.
//! Verification recomputes the digest and compares in constant time.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{TenantId, Timestamp, ValidationError};

use super::SubscriptionPlan;

/// Outcome of a signature check on well-formed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    Verified,
    Mismatch,
}

impl SignatureCheck {
    pub fn is_verified(&self) -> bool {
        matches!(self, SignatureCheck::Verified)
    }
}

/// Canonical string the gateway signs.
pub fn signing_string(order_id: &str, payment_id: &str) -> String {
    format!("{}|{}", order_id, payment_id)
}

/// Computes the expected signature as lowercase hex.
pub fn compute_signature(
    order_id: &str,
    payment_id: &str,
    secret: &str,
) -> Result<String, ValidationError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| ValidationError::invalid_format("secret", e.to_string()))?;
    mac.update(signing_string(order_id, payment_id).as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a claimed payment signature. Pure function, no I/O.
///
/// # Errors
///
/// Returns `ValidationError` when any input is empty. The signature
/// itself is never reported as malformed: anything that is not the exact
/// expected digest is a `Mismatch`.
pub fn verify_signature(
    order_id: &str,
    payment_id: &str,
    claimed_signature: &str,
    secret: &str,
) -> Result<SignatureCheck, ValidationError> {
    for (field, value) in [
        ("order_id", order_id),
        ("payment_id", payment_id),
        ("signature", claimed_signature),
        ("secret", secret),
    ] {
        if value.trim().is_empty() {
            return Err(ValidationError::empty_field(field));
        }
    }

    let expected = compute_signature(order_id, payment_id, secret)?;
    if constant_time_compare(expected.as_bytes(), claimed_signature.as_bytes()) {
        Ok(SignatureCheck::Verified)
    } else {
        Ok(SignatureCheck::Mismatch)
    }
}

/// Performs constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// A gateway order opened for a plan purchase, recorded at checkout so the
/// confirmation can be matched against what was actually charged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutIntent {
    pub order_id: String,
    pub tenant_id: TenantId,
    pub plan: SubscriptionPlan,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: Timestamp,
}

impl CheckoutIntent {
    /// Rejects a confirmation from another tenant or for a different plan.
    pub fn check_confirmation(
        &self,
        tenant_id: &TenantId,
        plan: SubscriptionPlan,
    ) -> Result<(), ValidationError> {
        if self.tenant_id != *tenant_id {
            return Err(ValidationError::invalid_format(
                "order_id",
                format!("order {} belongs to another tenant", self.order_id),
            ));
        }
        if self.plan != plan {
            return Err(ValidationError::invalid_format(
                "plan",
                format!(
                    "order {} was opened for the {} plan, not {}",
                    self.order_id,
                    self.plan.as_str(),
                    plan.as_str()
                ),
            ));
        }
        Ok(())
    }
}

/// Verification state stored with a payment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentVerificationStatus {
    Verified,
}

impl PaymentVerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentVerificationStatus::Verified => "verified",
        }
    }
}

/// Write-once record of a verified payment. `payment_id` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    pub tenant_id: TenantId,
    pub order_id: String,
    pub payment_id: String,
    pub plan: SubscriptionPlan,
    pub amount_minor: i64,
    pub currency: String,
    pub status: PaymentVerificationStatus,
    pub verified_at: Timestamp,
}

impl PaymentRecord {
    /// Record for a payment against a checkout order. Amount and currency
    /// are the ones the order was opened with.
    pub fn for_checkout(
        intent: &CheckoutIntent,
        payment_id: impl Into<String>,
        verified_at: Timestamp,
    ) -> Self {
        Self {
            tenant_id: intent.tenant_id,
            order_id: intent.order_id.clone(),
            payment_id: payment_id.into(),
            plan: intent.plan,
            amount_minor: intent.amount_minor,
            currency: intent.currency.clone(),
            status: PaymentVerificationStatus::Verified,
            verified_at,
        }
    }

    pub fn verified(
        tenant_id: TenantId,
        order_id: impl Into<String>,
        payment_id: impl Into<String>,
        plan: SubscriptionPlan,
        verified_at: Timestamp,
    ) -> Self {
        Self {
            tenant_id,
            order_id: order_id.into(),
            payment_id: payment_id.into(),
            plan,
            amount_minor: plan.amount_minor(),
            currency: super::PLAN_CURRENCY.to_string(),
            status: PaymentVerificationStatus::Verified,
            verified_at,
        }
    }
}
