//! VerifyPaymentHandler - Checks a payment signature and records the payment.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{
    verify_signature, CheckoutIntent, PaymentRecord, SignatureCheck, SubscriptionError,
    SubscriptionPlan,
};
use crate::ports::{Clock, PaymentRepository};

/// Command carrying the gateway's payment assertion.
#[derive(Debug, Clone)]
pub struct VerifyPaymentCommand {
    pub tenant_id: TenantId,
    pub plan: SubscriptionPlan,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Verifies `HMAC-SHA256(secret, order_id|payment_id)` and, on a match,
/// writes the payment row before returning.
pub struct VerifyPaymentHandler {
    payments: Arc<dyn PaymentRepository>,
    clock: Arc<dyn Clock>,
    key_secret: SecretString,
}

impl VerifyPaymentHandler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        clock: Arc<dyn Clock>,
        key_secret: SecretString,
    ) -> Self {
        Self {
            payments,
            clock,
            key_secret,
        }
    }

    /// Returns `Mismatch` without writing anything when the signature is
    /// wrong. A payment id that was already recorded is a `Conflict`.
    pub async fn handle(&self, cmd: VerifyPaymentCommand) -> Result<SignatureCheck, SubscriptionError> {
        let check = self.check(&cmd.tenant_id, &cmd.order_id, &cmd.payment_id, &cmd.signature)?;
        if check.is_verified() {
            let record = PaymentRecord::verified(
                cmd.tenant_id,
                cmd.order_id.trim(),
                cmd.payment_id.trim(),
                cmd.plan,
                self.clock.now(),
            );
            self.record(&record).await?;
        }
        Ok(check)
    }

    /// Same as `handle`, for a payment against a recorded checkout order.
    /// The stored row carries the amount the order was opened with.
    pub async fn handle_checkout(
        &self,
        intent: &CheckoutIntent,
        payment_id: &str,
        signature: &str,
    ) -> Result<SignatureCheck, SubscriptionError> {
        let check = self.check(&intent.tenant_id, &intent.order_id, payment_id, signature)?;
        if check.is_verified() {
            let record = PaymentRecord::for_checkout(intent, payment_id.trim(), self.clock.now());
            self.record(&record).await?;
        }
        Ok(check)
    }

    fn check(
        &self,
        tenant_id: &TenantId,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<SignatureCheck, SubscriptionError> {
        let check = verify_signature(
            order_id.trim(),
            payment_id.trim(),
            signature.trim(),
            self.key_secret.expose_secret(),
        )?;

        if !check.is_verified() {
            tracing::warn!(
                tenant_id = %tenant_id,
                order_id = %order_id,
                payment_id = %payment_id,
                "Payment signature mismatch"
            );
        }
        Ok(check)
    }

    async fn record(&self, record: &PaymentRecord) -> Result<(), SubscriptionError> {
        self.payments.record_verified(record).await?;
        tracing::info!(
            tenant_id = %record.tenant_id,
            order_id = %record.order_id,
            payment_id = %record.payment_id,
            amount_minor = record.amount_minor,
            "Payment verified"
        );
        Ok(())
    }
}
