//! GetSubscriptionStatusHandler - Query handler for a tenant's subscription state.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{
    SubscriptionError, SubscriptionPlan, SubscriptionStatus, Tenant,
};
use crate::ports::{Clock, TenantRepository};

/// Query for a tenant's subscription status.
#[derive(Debug, Clone)]
pub struct GetSubscriptionStatusQuery {
    pub tenant_id: TenantId,
}

/// Read model of a tenant's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionStatusView {
    pub tenant_id: TenantId,
    pub status: SubscriptionStatus,
    pub plan: Option<SubscriptionPlan>,
    pub trial_ends_at: Timestamp,
    pub subscription_end_date: Option<Timestamp>,
    pub is_active: bool,
    pub last_payment_date: Option<Timestamp>,
    /// Subscription end when paid, trial end otherwise.
    pub active_until: Option<Timestamp>,
    pub days_remaining: i64,
    /// Features of the current plan, empty during the trial.
    pub plan_features: &'static [&'static str],
}

impl SubscriptionStatusView {
    pub fn from_tenant(tenant: &Tenant, now: Timestamp) -> Self {
        Self {
            tenant_id: tenant.id,
            status: tenant.status,
            plan: tenant.plan,
            trial_ends_at: tenant.trial_ends_at,
            subscription_end_date: tenant.subscription_end_date,
            is_active: tenant.is_active,
            last_payment_date: tenant.last_payment_date,
            active_until: tenant.active_until(),
            days_remaining: tenant.days_remaining(now),
            plan_features: tenant.plan.map(|p| p.features()).unwrap_or(&[]),
        }
    }
}

/// Handler for status queries. Pure read: never writes, even when the
/// stored state has lapsed.
pub struct GetSubscriptionStatusHandler {
    tenants: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
}

impl GetSubscriptionStatusHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { tenants, clock }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionStatusQuery,
    ) -> Result<SubscriptionStatusView, SubscriptionError> {
        let tenant = self
            .tenants
            .find_by_id(&query.tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(format!("Tenant {}", query.tenant_id)))?;

        Ok(SubscriptionStatusView::from_tenant(&tenant, self.clock.now()))
    }
}
