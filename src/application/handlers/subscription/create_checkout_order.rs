//! CreateCheckoutOrderHandler - Opens a gateway order for a plan purchase.
//!
//! The order is recorded with its tenant, plan and amount so that
//! confirmation can only activate what was actually charged.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::subscription::{
    CheckoutIntent, SubscriptionError, SubscriptionPlan, PLAN_CURRENCY,
};
use crate::ports::{
    Clock, CreateOrderRequest, PaymentGateway, PaymentRepository, TenantRepository,
};

/// Command to start a checkout.
#[derive(Debug, Clone)]
pub struct CreateCheckoutOrderCommand {
    pub tenant_id: TenantId,
    pub plan: String,
}

/// What the client-side checkout widget needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutOrder {
    pub order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub plan: SubscriptionPlan,
    /// Public gateway key id. Never the secret.
    pub key_id: String,
}

pub struct CreateCheckoutOrderHandler {
    tenants: Arc<dyn TenantRepository>,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    clock: Arc<dyn Clock>,
}

/// Receipt reference sent with the order, `tenant_<id>_<unix>`. The id is
/// shortened to keep the receipt within the gateway's 40-character limit.
pub fn checkout_receipt(tenant_id: &TenantId, now: Timestamp) -> String {
    let id = tenant_id.as_uuid().simple().to_string();
    format!("tenant_{}_{}", &id[..12], now.as_unix_secs())
}

impl CreateCheckoutOrderHandler {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants,
            payments,
            gateway,
            clock,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateCheckoutOrderCommand,
    ) -> Result<CheckoutOrder, SubscriptionError> {
        // 1. Validate plan
        let plan: SubscriptionPlan = cmd.plan.parse()?;

        // 2. Guard: no stacking on a running paid period
        let tenant = self
            .tenants
            .find_by_id(&cmd.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(format!("Tenant {}", cmd.tenant_id)))?;
        let now = self.clock.now();
        tenant.ensure_can_purchase(now)?;

        // 3. Create the external order
        let mut notes = BTreeMap::new();
        notes.insert("tenant_id".to_string(), tenant.id.to_string());
        notes.insert("tenant_name".to_string(), tenant.name.clone());
        notes.insert("plan".to_string(), plan.as_str().to_string());

        let request = CreateOrderRequest {
            amount: plan.amount_minor(),
            currency: PLAN_CURRENCY.to_string(),
            receipt: checkout_receipt(&tenant.id, now),
            notes,
        };

        let order = self.gateway.create_order(request).await.map_err(|e| {
            tracing::error!(tenant_id = %tenant.id, error = %e, "Gateway order creation failed");
            SubscriptionError::from(DomainError::from(e))
        })?;

        // 4. Remember what this order is for
        let intent = CheckoutIntent {
            order_id: order.id.clone(),
            tenant_id: tenant.id,
            plan,
            amount_minor: order.amount,
            currency: order.currency.clone(),
            created_at: now,
        };
        self.payments.record_checkout(&intent).await.map_err(|e| {
            tracing::error!(
                tenant_id = %tenant.id,
                order_id = %order.id,
                error = %e,
                "Gateway order created but not recorded"
            );
            SubscriptionError::from(e)
        })?;

        tracing::info!(
            tenant_id = %tenant.id,
            order_id = %order.id,
            plan = plan.as_str(),
            "Checkout order created"
        );

        Ok(CheckoutOrder {
            order_id: order.id,
            amount_minor: order.amount,
            currency: order.currency,
            plan,
            key_id: self.gateway.public_key_id().to_string(),
        })
    }
}
