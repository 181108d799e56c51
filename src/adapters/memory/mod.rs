//! In-memory persistence adapter.
//!
//! Implements every persistence port over one mutex-guarded state, so each
//! call is a single atomic unit of work, matching the transactional
//! behavior of the Postgres adapters. Used by tests and local development.
//!
//! Supports:
//! - Seeding orders, menu items and tables
//! - Injected lock contention (`fail_next_with_busy`)
//! - Injected per-tenant write failures (`fail_writes_for`)

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::otp::{OtpCode, OtpToken};
use crate::domain::reporting::ReportOrder;
use crate::domain::retention::{DataDeletionLog, DataPurgeCounts, PurgedTenant};
use crate::domain::subscription::{
    normalize_email, CheckoutIntent, PaymentRecord, SubscriptionEvent, SubscriptionStatus, Tenant,
};
use crate::ports::{
    OrderReader, OtpRepository, PaymentRepository, RetentionStore, TenantRepository,
};

#[derive(Debug, Clone)]
struct StoredOrder {
    tenant_id: TenantId,
    order: ReportOrder,
}

#[derive(Debug, Default)]
struct State {
    tenants: HashMap<TenantId, Tenant>,
    events: Vec<SubscriptionEvent>,
    otps: Vec<OtpToken>,
    payments: Vec<PaymentRecord>,
    checkouts: Vec<CheckoutIntent>,
    orders: Vec<StoredOrder>,
    menu_items: HashMap<TenantId, u64>,
    tables: HashMap<TenantId, u64>,
    deletion_logs: Vec<DataDeletionLog>,
    next_order_id: i64,

    busy_failures: u32,
    failing_tenants: HashSet<TenantId>,
}

/// In-memory implementation of all persistence ports. Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
    retry: RetryPolicy,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            retry: RetryPolicy::new(3, Duration::from_millis(2)),
        }
    }

    // ── Test and seeding helpers ────────────────────────────────────

    /// Stores a tenant as-is, bypassing uniqueness checks.
    pub fn seed_tenant(&self, tenant: Tenant) {
        self.lock().tenants.insert(tenant.id, tenant);
    }

    pub fn add_order(&self, tenant_id: TenantId, total_minor: i64, created_at: Timestamp) -> i64 {
        let mut state = self.lock();
        state.next_order_id += 1;
        let order_id = state.next_order_id;
        state.orders.push(StoredOrder {
            tenant_id,
            order: ReportOrder {
                order_id,
                table_number: format!("T{}", order_id),
                status: "completed".to_string(),
                total_minor,
                created_at,
            },
        });
        order_id
    }

    pub fn add_menu_items(&self, tenant_id: TenantId, count: u64) {
        *self.lock().menu_items.entry(tenant_id).or_default() += count;
    }

    pub fn add_tables(&self, tenant_id: TenantId, count: u64) {
        *self.lock().tables.entry(tenant_id).or_default() += count;
    }

    pub fn order_count(&self, tenant_id: &TenantId) -> usize {
        self.lock().orders.iter().filter(|o| o.tenant_id == *tenant_id).count()
    }

    pub fn menu_item_count(&self, tenant_id: &TenantId) -> u64 {
        self.lock().menu_items.get(tenant_id).copied().unwrap_or(0)
    }

    pub fn table_count(&self, tenant_id: &TenantId) -> u64 {
        self.lock().tables.get(tenant_id).copied().unwrap_or(0)
    }

    pub fn all_events(&self) -> Vec<SubscriptionEvent> {
        self.lock().events.clone()
    }

    pub fn payments(&self) -> Vec<PaymentRecord> {
        self.lock().payments.clone()
    }

    pub fn checkouts(&self) -> Vec<CheckoutIntent> {
        self.lock().checkouts.clone()
    }

    pub fn otp_tokens_for(&self, email: &str) -> Vec<OtpToken> {
        let email = normalize_email(email);
        self.lock().otps.iter().filter(|t| t.email == email).cloned().collect()
    }

    pub fn deletion_logs(&self) -> Vec<DataDeletionLog> {
        self.lock().deletion_logs.clone()
    }

    /// The next `n` storage calls fail with `STORAGE_BUSY`.
    pub fn fail_next_with_busy(&self, n: u32) {
        self.lock().busy_failures = n;
    }

    /// Writes touching this tenant fail with a database error.
    pub fn fail_writes_for(&self, tenant_id: TenantId) {
        self.lock().failing_tenants.insert(tenant_id);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn with_state<T>(
        &self,
        f: impl FnOnce(&mut State) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut state = self.lock();
        if state.busy_failures > 0 {
            state.busy_failures -= 1;
            return Err(DomainError::storage_busy("simulated lock contention"));
        }
        f(&mut state)
    }

    async fn op<T>(
        &self,
        operation: &str,
        f: impl Fn(&mut State) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        self.retry
            .run(operation, || std::future::ready(self.with_state(&f)))
            .await
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_writable(state: &State, id: &TenantId) -> Result<(), DomainError> {
    if state.failing_tenants.contains(id) {
        return Err(DomainError::database(format!("simulated write failure for tenant {}", id)));
    }
    Ok(())
}

fn sorted_by_creation(mut tenants: Vec<Tenant>) -> Vec<Tenant> {
    tenants.sort_by_key(|t| t.created_at);
    tenants
}

#[async_trait]
impl TenantRepository for InMemoryStore {
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        self.op("tenant.insert", |state| {
            if state.tenants.values().any(|t| t.slug == tenant.slug) {
                return Err(DomainError::new(
                    ErrorCode::SlugTaken,
                    format!("Slug '{}' is already taken", tenant.slug),
                ));
            }
            if state.tenants.values().any(|t| t.owner_email == tenant.owner_email) {
                return Err(DomainError::new(
                    ErrorCode::EmailTaken,
                    "An account with this email already exists",
                ));
            }
            state.tenants.insert(tenant.id, tenant.clone());
            Ok(())
        })
        .await
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        self.op("tenant.find_by_id", |state| Ok(state.tenants.get(id).cloned()))
            .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError> {
        let slug = slug.trim().to_ascii_lowercase();
        self.op("tenant.find_by_slug", |state| {
            Ok(state.tenants.values().find(|t| t.slug.as_str() == slug).cloned())
        })
        .await
    }

    async fn find_by_owner_email(&self, email: &str) -> Result<Option<Tenant>, DomainError> {
        let email = normalize_email(email);
        self.op("tenant.find_by_owner_email", |state| {
            Ok(state.tenants.values().find(|t| t.owner_email == email).cloned())
        })
        .await
    }

    async fn mark_email_verified(&self, email: &str) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        self.op("tenant.mark_email_verified", |state| {
            match state.tenants.values_mut().find(|t| t.owner_email == email) {
                Some(tenant) => {
                    tenant.email_verified = true;
                    tenant.version += 1;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }

    async fn save_transition(
        &self,
        tenant: &Tenant,
        expected_version: i64,
        event: &SubscriptionEvent,
    ) -> Result<bool, DomainError> {
        self.op("tenant.save_transition", |state| {
            check_writable(state, &tenant.id)?;
            let current_version = match state.tenants.get(&tenant.id) {
                Some(stored) => stored.version,
                None => return Ok(false),
            };
            if current_version != expected_version {
                return Ok(false);
            }
            let mut updated = tenant.clone();
            updated.version = expected_version + 1;
            state.tenants.insert(updated.id, updated);
            state.events.push(event.clone());
            Ok(true)
        })
        .await
    }

    async fn find_expired_trials(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError> {
        self.op("tenant.find_expired_trials", |state| {
            Ok(sorted_by_creation(
                state
                    .tenants
                    .values()
                    .filter(|t| t.status == SubscriptionStatus::Trial && t.trial_ends_at < now)
                    .cloned()
                    .collect(),
            ))
        })
        .await
    }

    async fn find_lapsed_subscriptions(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError> {
        self.op("tenant.find_lapsed_subscriptions", |state| {
            Ok(sorted_by_creation(
                state
                    .tenants
                    .values()
                    .filter(|t| {
                        t.status == SubscriptionStatus::Active
                            && t.subscription_end_date.map_or(false, |end| end < now)
                    })
                    .cloned()
                    .collect(),
            ))
        })
        .await
    }

    async fn find_purge_candidates(
        &self,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Vec<Tenant>, DomainError> {
        self.op("tenant.find_purge_candidates", |state| {
            Ok(sorted_by_creation(
                state
                    .tenants
                    .values()
                    .filter(|t| t.is_purge_eligible(now, threshold_days))
                    .cloned()
                    .collect(),
            ))
        })
        .await
    }

    async fn purge_tenant(
        &self,
        id: &TenantId,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Option<PurgedTenant>, DomainError> {
        self.op("tenant.purge", |state| {
            check_writable(state, id)?;
            let tenant = match state.tenants.get(id) {
                Some(t) if t.is_purge_eligible(now, threshold_days) => t.clone(),
                _ => return Ok(None),
            };

            let orders_before = state.orders.len();
            state.orders.retain(|o| o.tenant_id != *id);
            let orders = (orders_before - state.orders.len()) as u64;
            let menu_items = state.menu_items.remove(id).unwrap_or(0);
            let tables = state.tables.remove(id).unwrap_or(0);
            state.checkouts.retain(|c| c.tenant_id != *id);
            state.tenants.remove(id);
            state.events.push(tenant.deletion_event(now, threshold_days));

            Ok(Some(PurgedTenant {
                tenant_id: *id,
                slug: tenant.slug.to_string(),
                orders,
                menu_items,
                tables,
            }))
        })
        .await
    }

    async fn list_with_owner_email(&self) -> Result<Vec<Tenant>, DomainError> {
        self.op("tenant.list_with_owner_email", |state| {
            Ok(sorted_by_creation(
                state
                    .tenants
                    .values()
                    .filter(|t| !t.owner_email.trim().is_empty())
                    .cloned()
                    .collect(),
            ))
        })
        .await
    }

    async fn events_for_tenant(
        &self,
        id: &TenantId,
    ) -> Result<Vec<SubscriptionEvent>, DomainError> {
        self.op("tenant.events_for_tenant", |state| {
            let mut events: Vec<_> = state
                .events
                .iter()
                .filter(|e| e.tenant_id == *id)
                .cloned()
                .collect();
            events.sort_by_key(|e| e.occurred_at);
            Ok(events)
        })
        .await
    }
}

#[async_trait]
impl OtpRepository for InMemoryStore {
    async fn replace_for_email(&self, token: &OtpToken) -> Result<(), DomainError> {
        self.op("otp.replace_for_email", |state| {
            state.otps.retain(|t| t.email != token.email || t.used);
            state.otps.push(token.clone());
            Ok(())
        })
        .await
    }

    async fn consume(
        &self,
        email: &str,
        code: &OtpCode,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        self.op("otp.consume", |state| {
            match state
                .otps
                .iter_mut()
                .find(|t| t.email == email && t.accepts(code, now))
            {
                Some(token) => {
                    token.used = true;
                    Ok(true)
                }
                None => Ok(false),
            }
        })
        .await
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn record_verified(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        self.op("payment.record_verified", |state| {
            if state.payments.iter().any(|p| p.payment_id == record.payment_id) {
                return Err(DomainError::new(
                    ErrorCode::DuplicatePayment,
                    format!("Payment {} has already been applied", record.payment_id),
                ));
            }
            state.payments.push(record.clone());
            Ok(())
        })
        .await
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        self.op("payment.find_by_payment_id", |state| {
            Ok(state.payments.iter().find(|p| p.payment_id == payment_id).cloned())
        })
        .await
    }

    async fn record_checkout(&self, intent: &CheckoutIntent) -> Result<(), DomainError> {
        self.op("payment.record_checkout", |state| {
            if state.checkouts.iter().any(|c| c.order_id == intent.order_id) {
                return Err(DomainError::new(
                    ErrorCode::DuplicatePayment,
                    format!("Order {} has already been recorded", intent.order_id),
                ));
            }
            state.checkouts.push(intent.clone());
            Ok(())
        })
        .await
    }

    async fn find_checkout(&self, order_id: &str) -> Result<Option<CheckoutIntent>, DomainError> {
        self.op("payment.find_checkout", |state| {
            Ok(state.checkouts.iter().find(|c| c.order_id == order_id).cloned())
        })
        .await
    }
}

#[async_trait]
impl RetentionStore for InMemoryStore {
    async fn purge_operational_data(
        &self,
        cutoff: Timestamp,
    ) -> Result<DataPurgeCounts, DomainError> {
        self.op("retention.purge_operational_data", |state| {
            let orders = state.orders.len();
            state.orders.retain(|o| o.order.created_at >= cutoff);
            let payments = state.payments.len();
            state.payments.retain(|p| p.verified_at >= cutoff);
            state.checkouts.retain(|c| c.created_at >= cutoff);
            let events = state.events.len();
            state.events.retain(|e| e.occurred_at >= cutoff);

            Ok(DataPurgeCounts {
                orders: (orders - state.orders.len()) as u64,
                payments: (payments - state.payments.len()) as u64,
                events: (events - state.events.len()) as u64,
            })
        })
        .await
    }

    async fn record_data_deletion(&self, log: &DataDeletionLog) -> Result<(), DomainError> {
        self.op("retention.record_data_deletion", |state| {
            state.deletion_logs.push(log.clone());
            Ok(())
        })
        .await
    }

    async fn reclaim_storage(&self) -> Result<(), DomainError> {
        Ok(())
    }
}

#[async_trait]
impl OrderReader for InMemoryStore {
    async fn orders_between(
        &self,
        tenant_id: &TenantId,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<ReportOrder>, DomainError> {
        self.op("orders.between", |state| {
            let mut orders: Vec<ReportOrder> = state
                .orders
                .iter()
                .filter(|o| {
                    o.tenant_id == *tenant_id
                        && o.order.created_at >= since
                        && o.order.created_at < until
                })
                .map(|o| o.order.clone())
                .collect();
            orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(orders)
        })
        .await
    }
}
