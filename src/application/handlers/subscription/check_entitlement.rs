//! CheckEntitlementHandler - Entitlement and purchase-guard queries.
//!
//! Decisions are computed fresh from stored timestamps on every call.
//! Nothing here writes, so lapsed tenants stay untouched until the
//! retention sweeper transitions them.

use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{TenantId, Timestamp};
use crate::domain::subscription::{SubscriptionError, SubscriptionPlan};
use crate::ports::{Clock, TenantRepository};

/// Result of the "no stacked paid period" guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaidPlanGuard {
    pub has_active_plan: bool,
    pub plan: Option<SubscriptionPlan>,
    pub active_until: Option<Timestamp>,
}

/// Handler for entitlement checks.
pub struct CheckEntitlementHandler {
    tenants: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
}

impl CheckEntitlementHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { tenants, clock }
    }

    /// Whether the tenant may serve orders now. Unknown tenants are not
    /// entitled.
    pub async fn is_entitled(&self, tenant_id: &TenantId) -> Result<bool, SubscriptionError> {
        let tenant = self.tenants.find_by_id(tenant_id).await?;
        Ok(tenant.map_or(false, |t| t.is_entitled(self.clock.now())))
    }

    /// Same rule, resolved from the public slug carried by table codes.
    pub async fn is_entitled_by_slug(&self, slug: &str) -> Result<bool, SubscriptionError> {
        let tenant = self.tenants.find_by_slug(slug).await?;
        Ok(tenant.map_or(false, |t| t.is_entitled(self.clock.now())))
    }

    /// Purchase guard: true only while a paid period is still running.
    pub async fn has_active_paid_plan(
        &self,
        tenant_id: &TenantId,
    ) -> Result<PaidPlanGuard, SubscriptionError> {
        let tenant = self
            .tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found(format!("Tenant {}", tenant_id)))?;

        let plan = tenant.active_paid_plan(self.clock.now());
        Ok(PaidPlanGuard {
            has_active_plan: plan.is_some(),
            plan,
            active_until: plan.and(tenant.subscription_end_date),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use crate::domain::subscription::{Slug, SubscriptionStatus, Tenant};

    struct Fixture {
        store: InMemoryStore,
        clock: ManualClock,
        handler: CheckEntitlementHandler,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(Timestamp::now());
        let handler = CheckEntitlementHandler::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        Fixture { store, clock, handler }
    }

    fn trial(clock: &ManualClock, slug: &str) -> Tenant {
        Tenant::register(
            "Cafe",
            Slug::parse(slug).unwrap(),
            &format!("{}@x.com", slug),
            "h",
            7,
            clock.now(),
        )
    }

    #[tokio::test]
    async fn unknown_tenant_is_not_entitled() {
        let f = fixture();
        assert!(!f.handler.is_entitled(&TenantId::new()).await.unwrap());
        assert!(!f.handler.is_entitled_by_slug("nobody").await.unwrap());
    }

    #[tokio::test]
    async fn running_trial_is_entitled_by_id_and_slug() {
        let f = fixture();
        let tenant = trial(&f.clock, "cafe-one");
        f.store.seed_tenant(tenant.clone());

        assert!(f.handler.is_entitled(&tenant.id).await.unwrap());
        assert!(f.handler.is_entitled_by_slug("cafe-one").await.unwrap());
    }

    #[tokio::test]
    async fn deactivated_tenant_is_never_entitled() {
        let f = fixture();
        let mut tenant = trial(&f.clock, "cafe-two");
        tenant.is_active = false;
        f.store.seed_tenant(tenant.clone());

        assert!(!f.handler.is_entitled(&tenant.id).await.unwrap());
    }

    #[tokio::test]
    async fn guard_reports_running_paid_plan() {
        let f = fixture();
        let mut tenant = trial(&f.clock, "cafe-three");
        tenant.activate(SubscriptionPlan::Pro, "pay_1", f.clock.now()).unwrap();
        f.store.seed_tenant(tenant.clone());

        let guard = f.handler.has_active_paid_plan(&tenant.id).await.unwrap();
        assert!(guard.has_active_plan);
        assert_eq!(guard.plan, Some(SubscriptionPlan::Pro));
        assert_eq!(guard.active_until, tenant.subscription_end_date);

        f.clock.advance_days(31);
        let guard = f.handler.has_active_paid_plan(&tenant.id).await.unwrap();
        assert!(!guard.has_active_plan);
        assert_eq!(guard.active_until, None);
    }

    #[tokio::test]
    async fn guard_ignores_trial() {
        let f = fixture();
        let tenant = trial(&f.clock, "cafe-four");
        f.store.seed_tenant(tenant.clone());

        let guard = f.handler.has_active_paid_plan(&tenant.id).await.unwrap();
        assert!(!guard.has_active_plan);
        assert_eq!(tenant.status, SubscriptionStatus::Trial);
    }
}
