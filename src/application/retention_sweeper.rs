//! Retention sweeper - periodic lifecycle enforcement and data housekeeping.
//!
//! Four sub-jobs, each idempotent and safe to re-run:
//!
//! | Job | Selects | Effect |
//! |-----|---------|--------|
//! | `expire_trials` | `trial`, trial ended | `trial_expired`, deactivated |
//! | `expire_paid_subscriptions` | `active`, period ended | `inactive`, deactivated |
//! | `purge_inactive_tenants` | purge predicate | tenant and its data deleted |
//! | `purge_old_operational_data` | rows older than window | rows deleted, audit row |
//!
//! Per-tenant failures are logged and counted; the batch always continues.
//! A tenant whose row changed between selection and write is counted as
//! skipped and picked up again on the next run if it still qualifies.

use std::sync::Arc;

use crate::domain::foundation::DomainError;
use crate::domain::retention::{DataDeletionLog, DataPurgeCounts, RetentionDays, SweepOutcome, SweepReport};
use crate::domain::subscription::{SubscriptionError, SubscriptionEvent, Tenant};
use crate::ports::{Clock, RetentionStore, TenantRepository};

pub struct RetentionSweeper {
    tenants: Arc<dyn TenantRepository>,
    retention: Arc<dyn RetentionStore>,
    clock: Arc<dyn Clock>,
    purge_threshold_days: i64,
    retention_window: RetentionDays,
}

/// Outcome of one tenant's transition attempt.
enum Applied {
    Written,
    Stale,
}

impl RetentionSweeper {
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        retention: Arc<dyn RetentionStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tenants,
            retention,
            clock,
            purge_threshold_days: RetentionDays::DEFAULT_PURGE_THRESHOLD,
            retention_window: RetentionDays::default(),
        }
    }

    pub fn with_purge_threshold_days(mut self, days: i64) -> Self {
        self.purge_threshold_days = days;
        self
    }

    pub fn with_retention_window(mut self, window: RetentionDays) -> Self {
        self.retention_window = window;
        self
    }

    pub fn retention_window(&self) -> RetentionDays {
        self.retention_window
    }

    /// Moves every elapsed trial to `trial_expired`. Paid tenants are never
    /// selected.
    pub async fn expire_trials(&self) -> Result<SweepOutcome, SubscriptionError> {
        let now = self.clock.now();
        let candidates = self.tenants.find_expired_trials(now).await?;
        tracing::info!(candidates = candidates.len(), now = %now, "Expiring trials");

        let mut outcome = SweepOutcome::default();
        for tenant in candidates {
            let id = tenant.id;
            match self.apply(tenant, |t| t.expire_trial(now)).await {
                Ok(Applied::Written) => {
                    outcome.affected += 1;
                    tracing::info!(tenant_id = %id, "Trial expired");
                }
                Ok(Applied::Stale) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(tenant_id = %id, error = %e, "Failed to expire trial");
                }
            }
        }

        tracing::info!(
            affected = outcome.affected,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Trial expiry finished"
        );
        Ok(outcome)
    }

    /// Deactivates every paid tenant whose period has ended.
    pub async fn expire_paid_subscriptions(&self) -> Result<SweepOutcome, SubscriptionError> {
        let now = self.clock.now();
        let candidates = self.tenants.find_lapsed_subscriptions(now).await?;
        tracing::info!(candidates = candidates.len(), now = %now, "Expiring paid subscriptions");

        let mut outcome = SweepOutcome::default();
        for tenant in candidates {
            let id = tenant.id;
            let ended = tenant.subscription_end_date;
            match self.apply(tenant, |t| t.expire_subscription(now)).await {
                Ok(Applied::Written) => {
                    outcome.affected += 1;
                    tracing::info!(tenant_id = %id, ended = ?ended, "Subscription deactivated");
                }
                Ok(Applied::Stale) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(tenant_id = %id, error = %e, "Failed to deactivate subscription");
                }
            }
        }

        tracing::info!(
            affected = outcome.affected,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Subscription expiry finished"
        );
        Ok(outcome)
    }

    /// Permanently deletes tenants that never paid and sat expired past the
    /// threshold. Each candidate is rechecked inside its own deleting
    /// transaction, so a payment landing after selection saves the tenant.
    pub async fn purge_inactive_tenants(&self) -> Result<SweepOutcome, SubscriptionError> {
        let now = self.clock.now();
        let threshold = self.purge_threshold_days;
        let cutoff = now.minus_days(threshold);
        let candidates = self.tenants.find_purge_candidates(now, threshold).await?;
        tracing::warn!(
            candidates = candidates.len(),
            status = "trial_expired",
            last_payment_date = "NULL",
            is_active = false,
            cutoff = %cutoff,
            "Purging inactive tenants"
        );

        let mut outcome = SweepOutcome::default();
        for tenant in candidates {
            tracing::warn!(
                tenant_id = %tenant.id,
                slug = %tenant.slug,
                created_at = %tenant.created_at,
                trial_ends_at = %tenant.trial_ends_at,
                cutoff = %cutoff,
                "Deleting tenant"
            );
            match self.tenants.purge_tenant(&tenant.id, now, threshold).await {
                Ok(Some(purged)) => {
                    outcome.affected += 1;
                    tracing::warn!(
                        tenant_id = %purged.tenant_id,
                        slug = %purged.slug,
                        orders = purged.orders,
                        menu_items = purged.menu_items,
                        tables = purged.tables,
                        "Tenant deleted"
                    );
                }
                Ok(None) => {
                    outcome.skipped += 1;
                    tracing::info!(tenant_id = %tenant.id, "Tenant no longer qualifies for purge");
                }
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(tenant_id = %tenant.id, error = %e, "Failed to delete tenant");
                }
            }
        }

        tracing::warn!(
            deleted = outcome.affected,
            skipped = outcome.skipped,
            failed = outcome.failed,
            cutoff = %cutoff,
            "Tenant purge finished"
        );
        Ok(outcome)
    }

    /// Deletes orders, payment logs and subscription events older than
    /// `window`, records an audit row, then reclaims storage.
    ///
    /// A failed reclaim is logged; the deletion already happened.
    pub async fn purge_old_operational_data(
        &self,
        window: RetentionDays,
    ) -> Result<DataPurgeCounts, SubscriptionError> {
        let now = self.clock.now();
        let cutoff = window.cutoff(now);
        tracing::warn!(
            days_retained = window.days(),
            cutoff = %cutoff,
            "Deleting operational data older than cutoff"
        );

        let counts = self.retention.purge_operational_data(cutoff).await?;
        tracing::warn!(
            orders = counts.orders,
            payments = counts.payments,
            events = counts.events,
            cutoff = %cutoff,
            "Operational data deleted"
        );

        self.retention
            .record_data_deletion(&DataDeletionLog {
                counts,
                days_retained: window.days(),
                cutoff,
                deleted_at: now,
            })
            .await?;

        if let Err(e) = self.retention.reclaim_storage().await {
            tracing::warn!(error = %e, "Storage reclaim failed");
        }
        Ok(counts)
    }

    /// Runs every sub-job in order with the configured windows. A sub-job
    /// that cannot even select its candidates is logged and marked failed.
    pub async fn run_all(&self) -> SweepReport {
        let started = self.clock.now();
        let mut report = SweepReport {
            trials_expired: outcome_or_failed("expire_trials", self.expire_trials().await),
            subscriptions_expired: outcome_or_failed(
                "expire_paid_subscriptions",
                self.expire_paid_subscriptions().await,
            ),
            tenants_purged: outcome_or_failed(
                "purge_inactive_tenants",
                self.purge_inactive_tenants().await,
            ),
            data_purged: None,
        };

        match self.purge_old_operational_data(self.retention_window).await {
            Ok(counts) => report.data_purged = Some(counts),
            Err(e) => tracing::error!(job = "purge_old_operational_data", error = %e, "Sweep job failed"),
        }

        tracing::info!(
            started = %started,
            trials_expired = report.trials_expired.affected,
            subscriptions_expired = report.subscriptions_expired.affected,
            tenants_purged = report.tenants_purged.affected,
            has_failures = report.has_failures(),
            "Retention sweep finished"
        );
        report
    }

    /// Applies one transition with the optimistic version check.
    async fn apply(
        &self,
        mut tenant: Tenant,
        transition: impl FnOnce(&mut Tenant) -> Result<SubscriptionEvent, DomainError>,
    ) -> Result<Applied, DomainError> {
        let expected = tenant.version;
        let event = match transition(&mut tenant) {
            Ok(event) => event,
            // Selected by a stale read; no longer due.
            Err(_) => return Ok(Applied::Stale),
        };
        if self.tenants.save_transition(&tenant, expected, &event).await? {
            Ok(Applied::Written)
        } else {
            Ok(Applied::Stale)
        }
    }
}

fn outcome_or_failed(job: &str, result: Result<SweepOutcome, SubscriptionError>) -> SweepOutcome {
    result.unwrap_or_else(|e| {
        tracing::error!(job, error = %e, "Sweep job failed");
        SweepOutcome {
            failed: 1,
            ..SweepOutcome::default()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use crate::domain::foundation::Timestamp;
    use crate::domain::subscription::{PaymentRecord, Slug, SubscriptionPlan, SubscriptionStatus};
    use crate::ports::{PaymentRepository, TenantRepository as _};

    struct Fixture {
        store: InMemoryStore,
        clock: ManualClock,
        sweeper: RetentionSweeper,
    }

    fn fixture() -> Fixture {
        let store = InMemoryStore::new();
        let clock = ManualClock::new(Timestamp::now());
        let sweeper = RetentionSweeper::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(clock.clone()),
        );
        Fixture { store, clock, sweeper }
    }

    fn seed(f: &Fixture, slug: &str) -> Tenant {
        let tenant = Tenant::register(
            "Cafe",
            Slug::parse(slug).unwrap(),
            &format!("{}@x.com", slug),
            "h",
            7,
            f.clock.now(),
        );
        f.store.seed_tenant(tenant.clone());
        tenant
    }

    async fn reload(f: &Fixture, tenant: &Tenant) -> Option<Tenant> {
        f.store.find_by_id(&tenant.id).await.unwrap()
    }

    #[tokio::test]
    async fn expire_trials_is_idempotent() {
        let f = fixture();
        let tenant = seed(&f, "cafe-one");
        f.clock.advance_days(8);

        let first = f.sweeper.expire_trials().await.unwrap();
        let second = f.sweeper.expire_trials().await.unwrap();

        assert_eq!(first.affected, 1);
        assert_eq!(second, SweepOutcome::default());
        let stored = reload(&f, &tenant).await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::TrialExpired);
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn running_trial_is_not_expired() {
        let f = fixture();
        let tenant = seed(&f, "cafe-one");
        f.clock.advance_days(6);

        assert_eq!(f.sweeper.expire_trials().await.unwrap().affected, 0);
        assert_eq!(reload(&f, &tenant).await.unwrap().status, SubscriptionStatus::Trial);
    }

    #[tokio::test]
    async fn lapsed_paid_subscription_becomes_inactive() {
        let f = fixture();
        let mut tenant = seed(&f, "cafe-one");
        tenant
            .activate(SubscriptionPlan::Basic, "pay_1", f.clock.now())
            .unwrap();
        f.store.seed_tenant(tenant.clone());
        f.clock.advance_days(31);

        let outcome = f.sweeper.expire_paid_subscriptions().await.unwrap();

        assert_eq!(outcome.affected, 1);
        let stored = reload(&f, &tenant).await.unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Inactive);
        assert!(!stored.is_active);
        let events = f.store.events_for_tenant(&tenant.id).await.unwrap();
        assert!(events.last().unwrap().description.contains("expired on"));
    }

    #[tokio::test]
    async fn one_failing_tenant_does_not_abort_the_batch() {
        let f = fixture();
        let broken = seed(&f, "cafe-one");
        let healthy = seed(&f, "cafe-two");
        f.store.fail_writes_for(broken.id);
        f.clock.advance_days(8);

        let outcome = f.sweeper.expire_trials().await.unwrap();

        assert_eq!(outcome.affected, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(
            reload(&f, &healthy).await.unwrap().status,
            SubscriptionStatus::TrialExpired
        );
    }

    #[tokio::test]
    async fn purge_removes_tenant_and_dependents() {
        let f = fixture();
        let tenant = seed(&f, "cafe-one");
        f.store.add_order(tenant.id, 10_000, f.clock.now());
        f.store.add_menu_items(tenant.id, 12);
        f.store.add_tables(tenant.id, 4);
        f.clock.advance_days(8);
        f.sweeper.expire_trials().await.unwrap();
        f.clock.advance_days(32);

        let outcome = f.sweeper.purge_inactive_tenants().await.unwrap();

        assert_eq!(outcome.affected, 1);
        assert!(reload(&f, &tenant).await.is_none());
        assert_eq!(f.store.order_count(&tenant.id), 0);
        assert_eq!(f.store.menu_item_count(&tenant.id), 0);
        assert_eq!(f.store.table_count(&tenant.id), 0);
    }

    #[tokio::test]
    async fn tenant_with_payment_history_is_never_purged() {
        let f = fixture();
        let mut tenant = seed(&f, "cafe-one");
        f.clock.advance_days(8);
        f.sweeper.expire_trials().await.unwrap();
        tenant = reload(&f, &tenant).await.unwrap();
        tenant.last_payment_date = Some(f.clock.now());
        f.store.seed_tenant(tenant.clone());
        f.clock.advance_days(400);

        let outcome = f.sweeper.purge_inactive_tenants().await.unwrap();

        assert_eq!(outcome.affected, 0);
        assert!(reload(&f, &tenant).await.is_some());
    }

    #[tokio::test]
    async fn operational_purge_records_audit_row() {
        let f = fixture();
        let tenant = seed(&f, "cafe-one");
        let now = f.clock.now();
        f.store.add_order(tenant.id, 1_000, now.minus_days(100));
        f.store.add_order(tenant.id, 1_000, now.minus_days(10));
        f.store
            .record_verified(&PaymentRecord::verified(
                tenant.id,
                "order_1",
                "pay_old",
                SubscriptionPlan::Basic,
                now.minus_days(120),
            ))
            .await
            .unwrap();

        let window = RetentionDays::new(90).unwrap();
        let counts = f.sweeper.purge_old_operational_data(window).await.unwrap();

        assert_eq!(counts.orders, 1);
        assert_eq!(counts.payments, 1);
        assert_eq!(f.store.order_count(&tenant.id), 1);
        let logs = f.store.deletion_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].days_retained, 90);
        assert_eq!(logs[0].cutoff, now.minus_days(90));
    }

    #[tokio::test]
    async fn run_all_reports_each_job() {
        let f = fixture();
        seed(&f, "cafe-one");
        f.clock.advance_days(8);

        let report = f.sweeper.run_all().await;

        assert_eq!(report.trials_expired.affected, 1);
        assert!(report.data_purged.is_some());
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn unavailable_storage_marks_job_failed() {
        let f = fixture();
        f.store.fail_next_with_busy(100);

        let report = f.sweeper.run_all().await;

        assert!(report.has_failures());
        assert_eq!(report.trials_expired.failed, 1);
    }
}
