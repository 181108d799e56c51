//! GetSubscriptionEventsHandler - Reads a tenant's audit trail.

use std::sync::Arc;

use crate::domain::foundation::TenantId;
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent};
use crate::ports::TenantRepository;

#[derive(Debug, Clone)]
pub struct GetSubscriptionEventsQuery {
    pub tenant_id: TenantId,
}

/// Events outlive purged tenants, so an unknown id yields whatever history
/// remains rather than `NotFound`.
pub struct GetSubscriptionEventsHandler {
    tenants: Arc<dyn TenantRepository>,
}

impl GetSubscriptionEventsHandler {
    pub fn new(tenants: Arc<dyn TenantRepository>) -> Self {
        Self { tenants }
    }

    pub async fn handle(
        &self,
        query: GetSubscriptionEventsQuery,
    ) -> Result<Vec<SubscriptionEvent>, SubscriptionError> {
        Ok(self.tenants.events_for_tenant(&query.tenant_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryStore;
    use crate::domain::foundation::Timestamp;
    use crate::domain::subscription::{Slug, SubscriptionEventType, SubscriptionPlan, Tenant};
    use crate::ports::TenantRepository as _;

    #[tokio::test]
    async fn returns_events_in_order() {
        let store = InMemoryStore::new();
        let now = Timestamp::now();
        let mut tenant =
            Tenant::register("Cafe", Slug::parse("cafe").unwrap(), "a@x.com", "h", 7, now);
        store.insert(&tenant).await.unwrap();

        let event = tenant.activate(SubscriptionPlan::Basic, "pay_1", now).unwrap();
        assert!(store.save_transition(&tenant, 0, &event).await.unwrap());

        let handler = GetSubscriptionEventsHandler::new(Arc::new(store));
        let events = handler
            .handle(GetSubscriptionEventsQuery { tenant_id: tenant.id })
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, SubscriptionEventType::Activated);
    }

    #[tokio::test]
    async fn unknown_tenant_has_empty_history() {
        let handler = GetSubscriptionEventsHandler::new(Arc::new(InMemoryStore::new()));
        let events = handler
            .handle(GetSubscriptionEventsQuery { tenant_id: TenantId::new() })
            .await
            .unwrap();
        assert!(events.is_empty());
    }
}
