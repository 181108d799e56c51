//! Verified payment log port.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::domain::subscription::{CheckoutIntent, PaymentRecord};

/// Write-once storage of checkout orders and verified payments.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persist a verified payment.
    ///
    /// # Errors
    ///
    /// - `DuplicatePayment` if `payment_id` was recorded before
    async fn record_verified(&self, record: &PaymentRecord) -> Result<(), DomainError>;

    async fn find_by_payment_id(&self, payment_id: &str)
        -> Result<Option<PaymentRecord>, DomainError>;

    /// Persist the order opened at checkout.
    ///
    /// # Errors
    ///
    /// - `DuplicatePayment` if `order_id` was recorded before
    async fn record_checkout(&self, intent: &CheckoutIntent) -> Result<(), DomainError>;

    async fn find_checkout(&self, order_id: &str) -> Result<Option<CheckoutIntent>, DomainError>;
}
