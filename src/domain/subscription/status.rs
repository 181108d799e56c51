//! Subscription status state machine.
//!
//! Defines the lifecycle states of a tenant's subscription and the
//! transitions the engine and the retention sweeper may perform.

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tenant subscription status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Free trial window that starts at signup.
    Trial,

    /// Paid plan applied after a verified payment.
    Active,

    /// Trial window elapsed without payment. Candidate for purge.
    TrialExpired,

    /// Paid window elapsed without renewal.
    Inactive,
}

impl SubscriptionStatus {
    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::TrialExpired => "trial_expired",
            SubscriptionStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trial" => Ok(SubscriptionStatus::Trial),
            "active" => Ok(SubscriptionStatus::Active),
            "trial_expired" => Ok(SubscriptionStatus::TrialExpired),
            // Older rows used "suspended" for the same state.
            "inactive" | "suspended" => Ok(SubscriptionStatus::Inactive),
            other => Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Unknown subscription status: {}", other),
            )),
        }
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            // From TRIAL
            (Trial, Active)
                | (Trial, TrialExpired)
            // From ACTIVE
                | (Active, Active) // Renewal after the paid window elapsed
                | (Active, Inactive)
            // Reactivation by payment
                | (TrialExpired, Active)
                | (Inactive, Active)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Trial => vec![Active, TrialExpired],
            Active => vec![Active, Inactive],
            TrialExpired => vec![Active],
            Inactive => vec![Active],
        }
    }
}
