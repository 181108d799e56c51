//! Subscription audit events.
//!
//! Every change to a tenant's entitlement appends one `SubscriptionEvent`.
//! Events are never updated. Only the operational retention sweep removes
//! them, once they fall outside the retention window.

use crate::domain::foundation::{DomainError, ErrorCode, EventId, TenantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::SubscriptionStatus;

/// Kind of lifecycle change recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionEventType {
    Activated,
    Deactivated,
    TrialExpired,
    AccountDeleted,
}

impl SubscriptionEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionEventType::Activated => "activated",
            SubscriptionEventType::Deactivated => "deactivated",
            SubscriptionEventType::TrialExpired => "trial_expired",
            SubscriptionEventType::AccountDeleted => "account_deleted",
        }
    }
}

impl std::fmt::Display for SubscriptionEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionEventType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activated" => Ok(SubscriptionEventType::Activated),
            "deactivated" => Ok(SubscriptionEventType::Deactivated),
            "trial_expired" => Ok(SubscriptionEventType::TrialExpired),
            "account_deleted" => Ok(SubscriptionEventType::AccountDeleted),
            other => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Unknown subscription event type: {}", other),
            )),
        }
    }
}

/// One row of the append-only subscription audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub id: EventId,
    pub tenant_id: TenantId,
    pub event_type: SubscriptionEventType,
    pub description: String,
    pub prior_status: Option<SubscriptionStatus>,
    pub new_status: Option<SubscriptionStatus>,
    pub occurred_at: Timestamp,
}

impl SubscriptionEvent {
    pub fn new(
        tenant_id: TenantId,
        event_type: SubscriptionEventType,
        description: impl Into<String>,
        prior_status: Option<SubscriptionStatus>,
        new_status: Option<SubscriptionStatus>,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            id: EventId::new(),
            tenant_id,
            event_type,
            description: description.into(),
            prior_status,
            new_status,
            occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_round_trips_through_storage_value() {
        for t in [
            SubscriptionEventType::Activated,
            SubscriptionEventType::Deactivated,
            SubscriptionEventType::TrialExpired,
            SubscriptionEventType::AccountDeleted,
        ] {
            assert_eq!(t.as_str().parse::<SubscriptionEventType>().unwrap(), t);
        }
    }

    #[test]
    fn new_event_gets_fresh_id() {
        let tenant = TenantId::new();
        let now = Timestamp::now();
        let a = SubscriptionEvent::new(tenant, SubscriptionEventType::Activated, "x", None, None, now);
        let b = SubscriptionEvent::new(tenant, SubscriptionEventType::Activated, "x", None, None, now);
        assert_ne!(a.id, b.id);
    }
}
