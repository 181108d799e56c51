//! Tenant aggregate.
//!
//! A tenant is one restaurant account. Its subscription fields decide
//! whether the account may serve orders right now.
//!
//! # Design Decisions
//!
//! - **Clock-free**: every rule takes `now` as an argument; nothing here
//!   reads the system clock.
//! - **Reads never write**: `is_entitled` only computes. Expiry transitions
//!   belong to the retention sweeper.
//! - **Fail-secure**: `is_active == false` denies entitlement regardless of
//!   status or dates.
//! - **Money in paise**: plan prices are i64 minor units.

use crate::domain::foundation::{DomainError, ErrorCode, StateMachine, TenantId, Timestamp};
use serde::{Deserialize, Serialize};

use super::{Slug, SubscriptionEvent, SubscriptionEventType, SubscriptionPlan, SubscriptionStatus};

/// Tenant aggregate.
///
/// # Invariants
///
/// - `slug` and `owner_email` are unique across tenants (storage enforced)
/// - Status transitions follow `SubscriptionStatus` state machine rules
/// - At most one of trial-active and paid-active holds at a time
/// - Every transition to `is_active == false` produces a `SubscriptionEvent`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub slug: Slug,
    pub owner_email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email_verified: bool,

    pub status: SubscriptionStatus,
    pub plan: Option<SubscriptionPlan>,
    pub trial_ends_at: Timestamp,
    pub subscription_start_date: Option<Timestamp>,
    pub subscription_end_date: Option<Timestamp>,
    pub is_active: bool,
    pub last_payment_date: Option<Timestamp>,
    pub last_payment_id: Option<String>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,

    /// Optimistic concurrency token, bumped by storage on every write.
    pub version: i64,
}

/// Normalizes an email address for lookup and uniqueness.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

impl Tenant {
    /// Creates a tenant at signup: `trial`, active, trial ending
    /// `trial_days` after `now`.
    pub fn register(
        name: impl Into<String>,
        slug: Slug,
        owner_email: &str,
        password_hash: impl Into<String>,
        trial_days: i64,
        now: Timestamp,
    ) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            slug,
            owner_email: normalize_email(owner_email),
            password_hash: password_hash.into(),
            email_verified: false,
            status: SubscriptionStatus::Trial,
            plan: None,
            trial_ends_at: now.add_days(trial_days),
            subscription_start_date: None,
            subscription_end_date: None,
            is_active: true,
            last_payment_date: None,
            last_payment_id: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Whether the tenant may use gated features at `now`.
    pub fn is_entitled(&self, now: Timestamp) -> bool {
        if !self.is_active {
            return false;
        }
        match self.status {
            SubscriptionStatus::Trial => now < self.trial_ends_at,
            SubscriptionStatus::Active => self.subscription_end_date.map_or(false, |end| now < end),
            SubscriptionStatus::TrialExpired | SubscriptionStatus::Inactive => false,
        }
    }

    /// The paid plan still running at `now`, if any.
    ///
    /// This is the purchase guard: a second paid period cannot be stacked
    /// while this returns `Some`.
    pub fn active_paid_plan(&self, now: Timestamp) -> Option<SubscriptionPlan> {
        if self.status != SubscriptionStatus::Active {
            return None;
        }
        match self.subscription_end_date {
            Some(end) if now < end => self.plan,
            _ => None,
        }
    }

    /// Returns a conflict error when a paid plan is still running.
    pub fn ensure_can_purchase(&self, now: Timestamp) -> Result<(), DomainError> {
        match self.active_paid_plan(now) {
            Some(plan) => {
                let until = self
                    .subscription_end_date
                    .map(|end| end.date().to_string())
                    .unwrap_or_default();
                Err(DomainError::new(
                    ErrorCode::SubscriptionConflict,
                    format!(
                        "You already have an active {} plan until {}. You can renew after it expires.",
                        plan.display_name(),
                        until
                    ),
                )
                .with_detail("plan", plan.as_str())
                .with_detail("active_until", until))
            }
            None => Ok(()),
        }
    }

    /// Applies a verified payment: starts a fresh paid period at `now`.
    ///
    /// # Errors
    ///
    /// - `SUBSCRIPTION_CONFLICT` if a paid period has not elapsed yet
    pub fn activate(
        &mut self,
        plan: SubscriptionPlan,
        payment_id: &str,
        now: Timestamp,
    ) -> Result<SubscriptionEvent, DomainError> {
        self.ensure_can_purchase(now)?;
        let prior = self.status;
        self.transition_to(SubscriptionStatus::Active)?;

        let end = now.add_days(plan.period_days());
        self.plan = Some(plan);
        self.subscription_start_date = Some(now);
        self.subscription_end_date = Some(end);
        self.is_active = true;
        self.last_payment_date = Some(now);
        self.last_payment_id = Some(payment_id.to_string());
        self.updated_at = now;

        Ok(SubscriptionEvent::new(
            self.id,
            SubscriptionEventType::Activated,
            format!(
                "{} plan activated with payment {}, valid until {}",
                plan.display_name(),
                payment_id,
                end.date()
            ),
            Some(prior),
            Some(SubscriptionStatus::Active),
            now,
        ))
    }

    /// Ends an elapsed trial: `trial_expired`, deactivated.
    ///
    /// # Errors
    ///
    /// - `INVALID_STATE_TRANSITION` if not in trial or the trial is still running
    pub fn expire_trial(&mut self, now: Timestamp) -> Result<SubscriptionEvent, DomainError> {
        if self.status != SubscriptionStatus::Trial || !(self.trial_ends_at < now) {
            return Err(self.not_due("expire trial"));
        }
        self.transition_to(SubscriptionStatus::TrialExpired)?;
        self.is_active = false;
        self.updated_at = now;

        Ok(SubscriptionEvent::new(
            self.id,
            SubscriptionEventType::TrialExpired,
            format!("Trial ended on {}", self.trial_ends_at.date()),
            Some(SubscriptionStatus::Trial),
            Some(SubscriptionStatus::TrialExpired),
            now,
        ))
    }

    /// Ends an elapsed paid period: `inactive`, deactivated.
    ///
    /// # Errors
    ///
    /// - `INVALID_STATE_TRANSITION` if not active or the period is still running
    pub fn expire_subscription(&mut self, now: Timestamp) -> Result<SubscriptionEvent, DomainError> {
        let end = match (self.status, self.subscription_end_date) {
            (SubscriptionStatus::Active, Some(end)) if end < now => end,
            _ => return Err(self.not_due("expire subscription")),
        };
        self.transition_to(SubscriptionStatus::Inactive)?;
        self.is_active = false;
        self.updated_at = now;

        Ok(SubscriptionEvent::new(
            self.id,
            SubscriptionEventType::Deactivated,
            format!("Subscription expired on {}", end.date()),
            Some(SubscriptionStatus::Active),
            Some(SubscriptionStatus::Inactive),
            now,
        ))
    }

    /// Whether the tenant may be permanently deleted at `now`.
    ///
    /// Requires all of: `trial_expired`, never paid, deactivated, created
    /// before the threshold, and trial ended before the threshold.
    pub fn is_purge_eligible(&self, now: Timestamp, threshold_days: i64) -> bool {
        let cutoff = now.minus_days(threshold_days);
        self.status == SubscriptionStatus::TrialExpired
            && self.last_payment_date.is_none()
            && !self.is_active
            && self.created_at < cutoff
            && self.trial_ends_at < cutoff
    }

    /// Event recorded when the tenant is purged.
    pub fn deletion_event(&self, now: Timestamp, threshold_days: i64) -> SubscriptionEvent {
        SubscriptionEvent::new(
            self.id,
            SubscriptionEventType::AccountDeleted,
            format!(
                "Account '{}' deleted: trial expired {} with no payment, past {}-day threshold",
                self.slug,
                self.trial_ends_at.date(),
                threshold_days
            ),
            Some(self.status),
            None,
            now,
        )
    }

    /// End of the current entitlement window.
    pub fn active_until(&self) -> Option<Timestamp> {
        match self.status {
            SubscriptionStatus::Trial | SubscriptionStatus::TrialExpired => Some(self.trial_ends_at),
            SubscriptionStatus::Active | SubscriptionStatus::Inactive => self.subscription_end_date,
        }
    }

    /// Whole days left in the current window. Returns 0 once it has ended.
    pub fn days_remaining(&self, now: Timestamp) -> i64 {
        match self.active_until() {
            Some(until) if now < until => until.duration_since(&now).num_days(),
            _ => 0,
        }
    }

    fn not_due(&self, action: &str) -> DomainError {
        DomainError::new(
            ErrorCode::InvalidStateTransition,
            format!("Cannot {} for tenant in {} state", action, self.status),
        )
        .with_detail("tenant_id", self.id.to_string())
    }

    fn transition_to(&mut self, target: SubscriptionStatus) -> Result<(), DomainError> {
        self.status = self.status.transition_to(target).map_err(|_| {
            DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!(
                    "Cannot transition subscription from {} to {}",
                    self.status, target
                ),
            )
        })?;
        Ok(())
    }
}
