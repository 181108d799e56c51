//! ActivateSubscriptionHandler - Command handler for applying a paid plan.
//!
//! The tenant row and its `activated` event are written in one unit. The
//! write is conditional on the version read, so two concurrent activations
//! cannot both stack a paid period: the loser reloads, and the purchase
//! guard rejects it.

use std::sync::Arc;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent, SubscriptionPlan, Tenant};
use crate::ports::{Clock, TenantRepository};

/// Attempts before giving up on a tenant that keeps changing underneath us.
const MAX_VERSION_ATTEMPTS: u32 = 3;

/// Command to activate a paid plan.
#[derive(Debug, Clone)]
pub struct ActivateSubscriptionCommand {
    pub tenant_id: TenantId,
    /// Plan name as submitted: `basic`, `pro` or `enterprise`.
    pub plan: String,
    pub payment_id: String,
}

/// Result of a successful activation.
#[derive(Debug, Clone)]
pub struct ActivateSubscriptionResult {
    pub tenant: Tenant,
    pub event: SubscriptionEvent,
}

pub struct ActivateSubscriptionHandler {
    tenants: Arc<dyn TenantRepository>,
    clock: Arc<dyn Clock>,
}

impl ActivateSubscriptionHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { tenants, clock }
    }

    pub async fn handle(
        &self,
        cmd: ActivateSubscriptionCommand,
    ) -> Result<ActivateSubscriptionResult, SubscriptionError> {
        // 1. Validate input before touching storage
        let plan: SubscriptionPlan = cmd.plan.parse()?;
        let payment_id = cmd.payment_id.trim();
        if payment_id.is_empty() {
            return Err(SubscriptionError::invalid_input("payment_id is required"));
        }

        for attempt in 1..=MAX_VERSION_ATTEMPTS {
            // 2. Load current state
            let mut tenant = self
                .tenants
                .find_by_id(&cmd.tenant_id)
                .await?
                .ok_or_else(|| SubscriptionError::not_found(format!("Tenant {}", cmd.tenant_id)))?;
            let expected_version = tenant.version;

            // 3. Guard and apply in memory
            let event = tenant.activate(plan, payment_id, self.clock.now())?;

            // 4. Persist row and event together
            if self
                .tenants
                .save_transition(&tenant, expected_version, &event)
                .await?
            {
                tenant.version = expected_version + 1;
                tracing::info!(
                    tenant_id = %tenant.id,
                    plan = plan.as_str(),
                    payment_id,
                    until = ?tenant.subscription_end_date,
                    "Subscription activated"
                );
                return Ok(ActivateSubscriptionResult { tenant, event });
            }

            tracing::warn!(
                tenant_id = %cmd.tenant_id,
                attempt,
                "Tenant changed during activation, rechecking"
            );
        }

        Err(SubscriptionError::conflict(
            "Your account was updated while processing the payment. Please try again.",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use crate::domain::foundation::{ErrorCode, Timestamp};
    use crate::domain::subscription::{Slug, SubscriptionEventType, SubscriptionStatus};
    use crate::ports::TenantRepository as _;

    struct Fixture {
        store: InMemoryStore,
        clock: ManualClock,
        handler: ActivateSubscriptionHandler,
        tenant: Tenant,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(Timestamp::now());
        let tenant = Tenant::register(
            "Cafe",
            Slug::parse("cafe").unwrap(),
            "a@x.com",
            "h",
            7,
            clock.now(),
        );
        store.seed_tenant(tenant.clone());
        let handler =
            ActivateSubscriptionHandler::new(Arc::new(store.clone()), Arc::new(clock.clone()));
        Fixture { store, clock, handler, tenant }
    }

    fn cmd(tenant_id: TenantId, plan: &str, payment_id: &str) -> ActivateSubscriptionCommand {
        ActivateSubscriptionCommand {
            tenant_id,
            plan: plan.to_string(),
            payment_id: payment_id.to_string(),
        }
    }

    #[tokio::test]
    async fn activates_trial_tenant_and_records_event() {
        let f = fixture();
        let result = f.handler.handle(cmd(f.tenant.id, "pro", "pay_1")).await.unwrap();

        assert_eq!(result.tenant.status, SubscriptionStatus::Active);
        assert_eq!(result.tenant.plan, Some(SubscriptionPlan::Pro));
        assert_eq!(
            result.tenant.subscription_end_date,
            Some(f.clock.now().add_days(30))
        );
        assert_eq!(result.event.event_type, SubscriptionEventType::Activated);

        let stored = f.store.find_by_id(&f.tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.last_payment_id.as_deref(), Some("pay_1"));
        assert_eq!(stored.version, result.tenant.version);
        assert_eq!(f.store.all_events().len(), 1);
    }

    #[tokio::test]
    async fn unknown_plan_is_invalid_input_and_writes_nothing() {
        let f = fixture();
        let err = f.handler.handle(cmd(f.tenant.id, "platinum", "pay_1")).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
        assert!(f.store.all_events().is_empty());
    }

    #[tokio::test]
    async fn empty_payment_id_is_invalid_input() {
        let f = fixture();
        let err = f.handler.handle(cmd(f.tenant.id, "basic", "  ")).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn missing_tenant_is_not_found() {
        let f = fixture();
        let err = f.handler.handle(cmd(TenantId::new(), "basic", "pay_1")).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::NotFound(_)));
    }

    #[tokio::test]
    async fn second_activation_conflicts_until_period_ends() {
        let f = fixture();
        f.handler.handle(cmd(f.tenant.id, "basic", "pay_1")).await.unwrap();

        let err = f.handler.handle(cmd(f.tenant.id, "pro", "pay_2")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::SubscriptionConflict);
        assert!(err.to_string().contains("Basic"));

        f.clock.advance_days(31);
        let renewed = f.handler.handle(cmd(f.tenant.id, "pro", "pay_2")).await.unwrap();
        assert_eq!(renewed.tenant.plan, Some(SubscriptionPlan::Pro));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_event() {
        let f = fixture();
        f.store.fail_writes_for(f.tenant.id);

        let err = f.handler.handle(cmd(f.tenant.id, "basic", "pay_1")).await.unwrap_err();
        assert!(matches!(err, SubscriptionError::Infrastructure(_)));

        let stored = f.store.find_by_id(&f.tenant.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Trial);
        assert!(f.store.all_events().is_empty());
    }
}
