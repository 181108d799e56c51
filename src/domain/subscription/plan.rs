//! Subscription plan catalog.
//!
//! Prices are held in minor units (paise) as i64, never floats.

use crate::domain::foundation::{DomainError, ErrorCode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Currency every plan is billed in.
pub const PLAN_CURRENCY: &str = "INR";

/// Paid plan a tenant can purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    Basic,
    Pro,
    Enterprise,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Basic,
        SubscriptionPlan::Pro,
        SubscriptionPlan::Enterprise,
    ];

    /// Storage and wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Pro => "pro",
            SubscriptionPlan::Enterprise => "enterprise",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SubscriptionPlan::Basic => "Basic",
            SubscriptionPlan::Pro => "Pro",
            SubscriptionPlan::Enterprise => "Enterprise",
        }
    }

    /// Price per period in paise.
    pub fn amount_minor(&self) -> i64 {
        match self {
            SubscriptionPlan::Basic => 249_900,
            SubscriptionPlan::Pro => 599_900,
            SubscriptionPlan::Enterprise => 1_599_900,
        }
    }

    /// Length of one paid period.
    pub fn period_days(&self) -> i64 {
        30
    }

    pub fn features(&self) -> &'static [&'static str] {
        match self {
            SubscriptionPlan::Basic => &["Up to 10 tables", "Basic analytics", "Email support"],
            SubscriptionPlan::Pro => &[
                "Up to 50 tables",
                "Advanced analytics",
                "Priority support",
                "Kitchen display",
            ],
            SubscriptionPlan::Enterprise => &[
                "Unlimited tables",
                "Full analytics",
                "24/7 support",
                "Kitchen display",
                "API access",
            ],
        }
    }
}

impl std::fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SubscriptionPlan {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(SubscriptionPlan::Basic),
            "pro" => Ok(SubscriptionPlan::Pro),
            "enterprise" => Ok(SubscriptionPlan::Enterprise),
            _ => Err(DomainError::new(
                ErrorCode::UnknownPlan,
                format!("Unknown subscription plan: {}", s),
            )
            .with_detail("plan", s)),
        }
    }
}
