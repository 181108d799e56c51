//! Tenant repository port.
//!
//! Persistence for tenant records and their append-only subscription events.
//!
//! # Design
//!
//! - **Per-tenant serialization**: writes are guarded by the row's
//!   `version`; there is no global lock
//! - **Record and event together**: a state change and its event commit in
//!   one transaction or not at all
//! - **Recheck before delete**: `purge_tenant` re-evaluates the purge
//!   predicate under a row lock inside the deleting transaction
//!
//! # Example
//!
//! ```ignore
//! let mut tenant = repo.find_by_id(&id).await?.ok_or(not_found)?;
//! let expected = tenant.version;
//! let event = tenant.expire_trial(clock.now())?;
//! if !repo.save_transition(&tenant, expected, &event).await? {
//!     // someone else changed the row first; reload and re-decide
//! }
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::retention::PurgedTenant;
use crate::domain::subscription::{SubscriptionEvent, Tenant};

/// Repository port for tenant persistence.
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// Insert a newly registered tenant.
    ///
    /// # Errors
    ///
    /// - `SlugTaken` / `EmailTaken` when the unique constraint rejects the row
    /// - `StorageUnavailable` when lock retries are exhausted
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError>;

    /// Slugs are stored lowercase.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError>;

    async fn find_by_owner_email(&self, email: &str) -> Result<Option<Tenant>, DomainError>;

    /// Marks the owner email verified. Returns false when no tenant has it.
    async fn mark_email_verified(&self, email: &str) -> Result<bool, DomainError>;

    /// Persist a mutated tenant and its event atomically.
    ///
    /// Applies only if the stored version still equals `expected_version`,
    /// and bumps the version. Returns false, writing nothing, when the row
    /// changed or vanished in between.
    async fn save_transition(
        &self,
        tenant: &Tenant,
        expected_version: i64,
        event: &SubscriptionEvent,
    ) -> Result<bool, DomainError>;

    /// Tenants in `trial` whose trial ended before `now`.
    async fn find_expired_trials(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError>;

    /// Tenants in `active` whose paid period ended before `now`.
    async fn find_lapsed_subscriptions(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError>;

    /// Tenants matching the purge predicate at `now`.
    async fn find_purge_candidates(
        &self,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Vec<Tenant>, DomainError>;

    /// Recheck the purge predicate for one tenant and, if it still holds,
    /// delete the tenant with its orders, menu items and tables, and append
    /// an `account_deleted` event, all in one transaction.
    ///
    /// Returns `None` when the tenant no longer qualifies or is gone.
    async fn purge_tenant(
        &self,
        id: &TenantId,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Option<PurgedTenant>, DomainError>;

    /// Tenants with a non-empty owner email, for report delivery.
    async fn list_with_owner_email(&self) -> Result<Vec<Tenant>, DomainError>;

    /// Audit log for one tenant, oldest first.
    async fn events_for_tenant(&self, id: &TenantId)
        -> Result<Vec<SubscriptionEvent>, DomainError>;
}
