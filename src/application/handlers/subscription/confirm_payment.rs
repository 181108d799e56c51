//! ConfirmPaymentHandler - Completes a purchase after client-side payment.
//!
//! Steps, each aborting the purchase on failure:
//! 1. Validate input
//! 2. Match the order recorded at checkout (tenant and plan)
//! 3. Recheck the purchase guard (a second checkout may have completed)
//! 4. Verify the signature, which records the payment
//! 5. Activate the plan

use std::sync::Arc;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{SubscriptionError, SubscriptionPlan};
use crate::ports::{Clock, PaymentRepository, TenantRepository};

use super::{
    ActivateSubscriptionCommand, ActivateSubscriptionHandler, ActivateSubscriptionResult,
    VerifyPaymentHandler,
};

/// Command sent by the client after the gateway reports success.
#[derive(Debug, Clone)]
pub struct ConfirmPaymentCommand {
    pub tenant_id: TenantId,
    pub plan: String,
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

pub struct ConfirmPaymentHandler {
    tenants: Arc<dyn TenantRepository>,
    payments: Arc<dyn PaymentRepository>,
    clock: Arc<dyn Clock>,
    verify: VerifyPaymentHandler,
    activate: ActivateSubscriptionHandler,
}

impl ConfirmPaymentHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        payments: Arc<dyn PaymentRepository>,
        clock: Arc<dyn Clock>,
        verify: VerifyPaymentHandler,
        activate: ActivateSubscriptionHandler,
    ) -> Self {
        Self {
            tenants,
            payments,
            clock,
            verify,
            activate,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmPaymentCommand,
    ) -> Result<ActivateSubscriptionResult, SubscriptionError> {
        // 1. Validate input
        let plan: SubscriptionPlan = cmd.plan.parse()?;
        for (field, value) in [
            ("order_id", &cmd.order_id),
            ("payment_id", &cmd.payment_id),
            ("signature", &cmd.signature),
        ] {
            if value.trim().is_empty() {
                return Err(SubscriptionError::invalid_input(format!("{} is required", field)));
            }
        }

        // 2. Match the checkout order
        let order_id = cmd.order_id.trim();
        let intent = self.payments.find_checkout(order_id).await?.ok_or_else(|| {
            SubscriptionError::invalid_input(format!("Unknown order {}", order_id))
        })?;
        if let Err(e) = intent.check_confirmation(&cmd.tenant_id, plan) {
            tracing::warn!(
                tenant_id = %cmd.tenant_id,
                order_id = %order_id,
                plan = plan.as_str(),
                error = %e,
                "Confirmation does not match checkout order"
            );
            return Err(e.into());
        }

        // 3. Recheck guard
        let tenant = self
            .tenants
            .find_by_id(&cmd.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(format!("Tenant {}", cmd.tenant_id)))?;
        tenant.ensure_can_purchase(self.clock.now())?;

        // 4. Verify signature and record payment
        let check = self
            .verify
            .handle_checkout(&intent, &cmd.payment_id, &cmd.signature)
            .await?;
        if !check.is_verified() {
            return Err(SubscriptionError::SignatureMismatch);
        }

        // 5. Activate
        self.activate
            .handle(ActivateSubscriptionCommand {
                tenant_id: cmd.tenant_id,
                plan: plan.as_str().to_string(),
                payment_id: cmd.payment_id.trim().to_string(),
            })
            .await
            .map_err(|e| {
                tracing::error!(
                    tenant_id = %cmd.tenant_id,
                    order_id = %order_id,
                    payment_id = %cmd.payment_id,
                    error = %e,
                    "Payment recorded but activation failed; needs reconciliation"
                );
                e
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use crate::domain::foundation::{ErrorCode, Timestamp};
    use crate::domain::subscription::{
        compute_signature, CheckoutIntent, Slug, SubscriptionStatus, Tenant,
    };
    use secrecy::SecretString;

    const SECRET: &str = "confirm_secret";

    struct Fixture {
        store: InMemoryStore,
        handler: ConfirmPaymentHandler,
        tenant: Tenant,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Timestamp::now()));
        let tenant = Tenant::register(
            "Cafe",
            Slug::parse("cafe").unwrap(),
            "a@x.com",
            "h",
            7,
            clock.now(),
        );
        store.seed_tenant(tenant.clone());
        let repo = Arc::new(store.clone());
        let handler = ConfirmPaymentHandler::new(
            repo.clone(),
            repo.clone(),
            clock.clone(),
            VerifyPaymentHandler::new(repo.clone(), clock.clone(), SecretString::new(SECRET.into())),
            ActivateSubscriptionHandler::new(repo, clock),
        );
        Fixture { store, handler, tenant }
    }

    async fn open_order(f: &Fixture, tenant_id: TenantId, order: &str, plan: SubscriptionPlan) {
        f.store
            .record_checkout(&CheckoutIntent {
                order_id: order.to_string(),
                tenant_id,
                plan,
                amount_minor: plan.amount_minor(),
                currency: "INR".to_string(),
                created_at: Timestamp::now(),
            })
            .await
            .unwrap();
    }

    fn cmd(tenant_id: TenantId, order: &str, payment: &str, signature: String) -> ConfirmPaymentCommand {
        ConfirmPaymentCommand {
            tenant_id,
            plan: "pro".to_string(),
            order_id: order.to_string(),
            payment_id: payment.to_string(),
            signature,
        }
    }

    #[tokio::test]
    async fn verified_payment_activates_plan() {
        let f = fixture();
        open_order(&f, f.tenant.id, "order_1", SubscriptionPlan::Pro).await;
        let sig = compute_signature("order_1", "pay_1", SECRET).unwrap();

        let result = f.handler.handle(cmd(f.tenant.id, "order_1", "pay_1", sig)).await.unwrap();

        assert_eq!(result.tenant.status, SubscriptionStatus::Active);
        let payments = f.store.payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_minor, 599_900);
    }

    #[tokio::test]
    async fn bad_signature_changes_nothing() {
        let f = fixture();
        open_order(&f, f.tenant.id, "order_1", SubscriptionPlan::Pro).await;
        let err = f
            .handler
            .handle(cmd(f.tenant.id, "order_1", "pay_1", "0".repeat(64)))
            .await
            .unwrap_err();

        assert_eq!(err, SubscriptionError::SignatureMismatch);
        assert!(f.store.payments().is_empty());
        assert!(f.store.all_events().is_empty());
    }

    #[tokio::test]
    async fn plan_other_than_ordered_is_rejected() {
        let f = fixture();
        open_order(&f, f.tenant.id, "order_1", SubscriptionPlan::Basic).await;
        let sig = compute_signature("order_1", "pay_1", SECRET).unwrap();

        let err = f.handler.handle(cmd(f.tenant.id, "order_1", "pay_1", sig)).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
        assert!(f.store.payments().is_empty());
        assert!(f.store.all_events().is_empty());
    }

    #[tokio::test]
    async fn order_of_another_tenant_is_rejected() {
        let f = fixture();
        open_order(&f, TenantId::new(), "order_1", SubscriptionPlan::Pro).await;
        let sig = compute_signature("order_1", "pay_1", SECRET).unwrap();

        let err = f.handler.handle(cmd(f.tenant.id, "order_1", "pay_1", sig)).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
        assert!(f.store.payments().is_empty());
    }

    #[tokio::test]
    async fn unknown_order_is_rejected() {
        let f = fixture();
        let sig = compute_signature("order_x", "pay_1", SECRET).unwrap();

        let err = f.handler.handle(cmd(f.tenant.id, "order_x", "pay_1", sig)).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
        assert!(f.store.payments().is_empty());
    }

    #[tokio::test]
    async fn guard_recheck_blocks_second_confirmation() {
        let f = fixture();
        open_order(&f, f.tenant.id, "order_1", SubscriptionPlan::Pro).await;
        open_order(&f, f.tenant.id, "order_2", SubscriptionPlan::Pro).await;
        let first = compute_signature("order_1", "pay_1", SECRET).unwrap();
        f.handler.handle(cmd(f.tenant.id, "order_1", "pay_1", first)).await.unwrap();

        let second = compute_signature("order_2", "pay_2", SECRET).unwrap();
        let err = f
            .handler
            .handle(cmd(f.tenant.id, "order_2", "pay_2", second))
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::SubscriptionConflict);
        assert_eq!(f.store.payments().len(), 1);
    }

    #[tokio::test]
    async fn missing_order_id_is_rejected_up_front() {
        let f = fixture();
        let err = f
            .handler
            .handle(cmd(f.tenant.id, "", "pay_1", "sig".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
    }
}
