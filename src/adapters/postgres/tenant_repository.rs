//! PostgreSQL implementation of TenantRepository.
//!
//! Every write is scoped to one tenant row. State changes use the `version`
//! column as an optimistic guard and commit together with their event.
//! Purges lock the row with `FOR UPDATE` and recheck the purge predicate
//! in the same transaction that deletes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::errors::{map_sqlx_error, unique_violation};
use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, ErrorCode, EventId, TenantId, Timestamp};
use crate::domain::retention::PurgedTenant;
use crate::domain::subscription::{
    normalize_email, Slug, SubscriptionEvent, SubscriptionEventType, SubscriptionPlan,
    SubscriptionStatus, Tenant,
};
use crate::ports::TenantRepository;

const TENANT_COLUMNS: &str = "id, name, slug, owner_email, password_hash, email_verified, \
    status, plan, trial_ends_at, subscription_start_date, subscription_end_date, is_active, \
    last_payment_date, last_payment_id, created_at, updated_at, version";

/// SQL form of `Tenant::is_purge_eligible`, comparing against the cutoff
/// bound at `cutoff_param`.
fn purge_predicate(cutoff_param: &str) -> String {
    format!(
        "status = 'trial_expired' \
         AND last_payment_date IS NULL \
         AND is_active = FALSE \
         AND created_at < {p} \
         AND trial_ends_at < {p}",
        p = cutoff_param
    )
}

/// PostgreSQL implementation of the TenantRepository port.
pub struct PostgresTenantRepository {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

/// Database row representation of a tenant.
#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: Uuid,
    name: String,
    slug: String,
    owner_email: String,
    password_hash: String,
    email_verified: bool,
    status: String,
    plan: Option<String>,
    trial_ends_at: DateTime<Utc>,
    subscription_start_date: Option<DateTime<Utc>>,
    subscription_end_date: Option<DateTime<Utc>>,
    is_active: bool,
    last_payment_date: Option<DateTime<Utc>>,
    last_payment_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = DomainError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let slug = Slug::parse(&row.slug).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored slug: {}", e))
        })?;
        let status = row.status.parse::<SubscriptionStatus>().map_err(corrupt)?;
        let plan = row
            .plan
            .as_deref()
            .map(str::parse::<SubscriptionPlan>)
            .transpose()
            .map_err(corrupt)?;

        Ok(Tenant {
            id: TenantId::from_uuid(row.id),
            name: row.name,
            slug,
            owner_email: row.owner_email,
            password_hash: row.password_hash,
            email_verified: row.email_verified,
            status,
            plan,
            trial_ends_at: Timestamp::from_datetime(row.trial_ends_at),
            subscription_start_date: row.subscription_start_date.map(Timestamp::from_datetime),
            subscription_end_date: row.subscription_end_date.map(Timestamp::from_datetime),
            is_active: row.is_active,
            last_payment_date: row.last_payment_date.map(Timestamp::from_datetime),
            last_payment_id: row.last_payment_id,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
            version: row.version,
        })
    }
}

/// Database row representation of a subscription event.
#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    tenant_id: Uuid,
    event_type: String,
    description: String,
    prior_status: Option<String>,
    new_status: Option<String>,
    occurred_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for SubscriptionEvent {
    type Error = DomainError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let parse_status = |s: Option<String>| {
            s.as_deref()
                .map(str::parse::<SubscriptionStatus>)
                .transpose()
                .map_err(corrupt)
        };
        Ok(SubscriptionEvent {
            id: EventId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            event_type: row.event_type.parse::<SubscriptionEventType>().map_err(corrupt)?,
            description: row.description,
            prior_status: parse_status(row.prior_status)?,
            new_status: parse_status(row.new_status)?,
            occurred_at: Timestamp::from_datetime(row.occurred_at),
        })
    }
}

fn corrupt(err: DomainError) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("Corrupt stored value: {}", err.message))
}

fn to_tenants(rows: Vec<TenantRow>) -> Result<Vec<Tenant>, DomainError> {
    rows.into_iter().map(Tenant::try_from).collect()
}

async fn insert_event<'e, E>(executor: E, event: &SubscriptionEvent) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO subscription_events (
            id, tenant_id, event_type, description, prior_status, new_status, occurred_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(event.id.as_uuid())
    .bind(event.tenant_id.as_uuid())
    .bind(event.event_type.as_str())
    .bind(&event.description)
    .bind(event.prior_status.map(|s| s.as_str()))
    .bind(event.new_status.map(|s| s.as_str()))
    .bind(event.occurred_at.as_datetime())
    .execute(executor)
    .await?;
    Ok(())
}

impl PostgresTenantRepository {
    async fn insert_once(&self, tenant: &Tenant) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, slug, owner_email, password_hash, email_verified, status, plan,
                trial_ends_at, subscription_start_date, subscription_end_date, is_active,
                last_payment_date, last_payment_id, created_at, updated_at, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(&tenant.name)
        .bind(tenant.slug.as_str())
        .bind(&tenant.owner_email)
        .bind(&tenant.password_hash)
        .bind(tenant.email_verified)
        .bind(tenant.status.as_str())
        .bind(tenant.plan.map(|p| p.as_str()))
        .bind(tenant.trial_ends_at.as_datetime())
        .bind(tenant.subscription_start_date.map(|t| *t.as_datetime()))
        .bind(tenant.subscription_end_date.map(|t| *t.as_datetime()))
        .bind(tenant.is_active)
        .bind(tenant.last_payment_date.map(|t| *t.as_datetime()))
        .bind(&tenant.last_payment_id)
        .bind(tenant.created_at.as_datetime())
        .bind(tenant.updated_at.as_datetime())
        .bind(tenant.version)
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some("tenants_slug_key") => DomainError::new(
                ErrorCode::SlugTaken,
                format!("Slug '{}' is already taken", tenant.slug),
            ),
            Some("tenants_owner_email_key") => DomainError::new(
                ErrorCode::EmailTaken,
                "An account with this email already exists",
            ),
            _ => map_sqlx_error("Failed to insert tenant", e),
        })?;

        Ok(())
    }

    async fn find_one(&self, filter: &str, value: &str) -> Result<Option<Tenant>, DomainError> {
        let sql = format!("SELECT {} FROM tenants WHERE {} = $1", TENANT_COLUMNS, filter);
        let row: Option<TenantRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to fetch tenant", e))?;
        row.map(Tenant::try_from).transpose()
    }

    async fn find_by_id_once(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        let sql = format!("SELECT {} FROM tenants WHERE id = $1", TENANT_COLUMNS);
        let row: Option<TenantRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to fetch tenant", e))?;
        row.map(Tenant::try_from).transpose()
    }

    async fn mark_email_verified_once(&self, email: &str) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "UPDATE tenants SET email_verified = TRUE, version = version + 1 WHERE owner_email = $1",
        )
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to mark email verified", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn save_transition_once(
        &self,
        tenant: &Tenant,
        expected_version: i64,
        event: &SubscriptionEvent,
    ) -> Result<bool, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE tenants SET
                status = $3,
                plan = $4,
                subscription_start_date = $5,
                subscription_end_date = $6,
                is_active = $7,
                last_payment_date = $8,
                last_payment_id = $9,
                updated_at = $10,
                version = version + 1
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(tenant.id.as_uuid())
        .bind(expected_version)
        .bind(tenant.status.as_str())
        .bind(tenant.plan.map(|p| p.as_str()))
        .bind(tenant.subscription_start_date.map(|t| *t.as_datetime()))
        .bind(tenant.subscription_end_date.map(|t| *t.as_datetime()))
        .bind(tenant.is_active)
        .bind(tenant.last_payment_date.map(|t| *t.as_datetime()))
        .bind(&tenant.last_payment_id)
        .bind(tenant.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to update tenant", e))?;

        if result.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("Failed to roll back", e))?;
            return Ok(false);
        }

        insert_event(&mut *tx, event)
            .await
            .map_err(|e| map_sqlx_error("Failed to append subscription event", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit tenant transition", e))?;
        Ok(true)
    }

    async fn find_where(
        &self,
        condition: &str,
        at: Timestamp,
    ) -> Result<Vec<Tenant>, DomainError> {
        let sql = format!(
            "SELECT {} FROM tenants WHERE {} ORDER BY created_at",
            TENANT_COLUMNS, condition
        );
        let rows: Vec<TenantRow> = sqlx::query_as(&sql)
            .bind(at.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to query tenants", e))?;
        to_tenants(rows)
    }

    async fn purge_candidates_once(&self, cutoff: Timestamp) -> Result<Vec<Tenant>, DomainError> {
        let sql = format!(
            "SELECT {} FROM tenants WHERE {} ORDER BY created_at",
            TENANT_COLUMNS,
            purge_predicate("$1")
        );
        let rows: Vec<TenantRow> = sqlx::query_as(&sql)
            .bind(cutoff.as_datetime())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to query purge candidates", e))?;
        to_tenants(rows)
    }

    async fn purge_tenant_once(
        &self,
        id: &TenantId,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Option<PurgedTenant>, DomainError> {
        let cutoff = now.minus_days(threshold_days);
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        let sql = format!(
            "SELECT {} FROM tenants WHERE id = $1 AND {} FOR UPDATE",
            TENANT_COLUMNS,
            purge_predicate("$2")
        );
        let row: Option<TenantRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .bind(cutoff.as_datetime())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to recheck purge candidate", e))?;

        let tenant = match row {
            Some(row) => Tenant::try_from(row)?,
            None => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("Failed to roll back", e))?;
                return Ok(None);
            }
        };

        let mut deleted = [0u64; 3];
        for (i, table) in ["orders", "menu_items", "restaurant_tables"].iter().enumerate() {
            let sql = format!("DELETE FROM {} WHERE tenant_id = $1", table);
            deleted[i] = sqlx::query(&sql)
                .bind(id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("Failed to delete tenant data", e))?
                .rows_affected();
        }

        sqlx::query("DELETE FROM tenants WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete tenant", e))?;

        insert_event(&mut *tx, &tenant.deletion_event(now, threshold_days))
            .await
            .map_err(|e| map_sqlx_error("Failed to append deletion event", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit tenant purge", e))?;

        Ok(Some(PurgedTenant {
            tenant_id: *id,
            slug: tenant.slug.to_string(),
            orders: deleted[0],
            menu_items: deleted[1],
            tables: deleted[2],
        }))
    }

    async fn list_with_owner_email_once(&self) -> Result<Vec<Tenant>, DomainError> {
        let sql = format!(
            "SELECT {} FROM tenants WHERE owner_email <> '' ORDER BY created_at",
            TENANT_COLUMNS
        );
        let rows: Vec<TenantRow> = sqlx::query_as(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("Failed to list tenants", e))?;
        to_tenants(rows)
    }

    async fn events_for_tenant_once(
        &self,
        id: &TenantId,
    ) -> Result<Vec<SubscriptionEvent>, DomainError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, event_type, description, prior_status, new_status, occurred_at
            FROM subscription_events
            WHERE tenant_id = $1
            ORDER BY occurred_at
            "#,
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch subscription events", e))?;
        rows.into_iter().map(SubscriptionEvent::try_from).collect()
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn insert(&self, tenant: &Tenant) -> Result<(), DomainError> {
        self.retry
            .run("tenant.insert", move || self.insert_once(tenant))
            .await
    }

    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, DomainError> {
        self.retry
            .run("tenant.find_by_id", move || self.find_by_id_once(id))
            .await
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Tenant>, DomainError> {
        let slug = slug.trim().to_ascii_lowercase();
        let slug = slug.as_str();
        self.retry
            .run("tenant.find_by_slug", move || self.find_one("slug", slug))
            .await
    }

    async fn find_by_owner_email(&self, email: &str) -> Result<Option<Tenant>, DomainError> {
        let email = normalize_email(email);
        let email = email.as_str();
        self.retry
            .run("tenant.find_by_owner_email", move || {
                self.find_one("owner_email", email)
            })
            .await
    }

    async fn mark_email_verified(&self, email: &str) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        let email = email.as_str();
        self.retry
            .run("tenant.mark_email_verified", move || {
                self.mark_email_verified_once(email)
            })
            .await
    }

    async fn save_transition(
        &self,
        tenant: &Tenant,
        expected_version: i64,
        event: &SubscriptionEvent,
    ) -> Result<bool, DomainError> {
        self.retry
            .run("tenant.save_transition", move || {
                self.save_transition_once(tenant, expected_version, event)
            })
            .await
    }

    async fn find_expired_trials(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError> {
        self.retry
            .run("tenant.find_expired_trials", move || {
                self.find_where("status = 'trial' AND trial_ends_at < $1", now)
            })
            .await
    }

    async fn find_lapsed_subscriptions(&self, now: Timestamp) -> Result<Vec<Tenant>, DomainError> {
        self.retry
            .run("tenant.find_lapsed_subscriptions", move || {
                self.find_where(
                    "status = 'active' AND subscription_end_date IS NOT NULL \
                     AND subscription_end_date < $1",
                    now,
                )
            })
            .await
    }

    async fn find_purge_candidates(
        &self,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Vec<Tenant>, DomainError> {
        let cutoff = now.minus_days(threshold_days);
        self.retry
            .run("tenant.find_purge_candidates", move || {
                self.purge_candidates_once(cutoff)
            })
            .await
    }

    async fn purge_tenant(
        &self,
        id: &TenantId,
        now: Timestamp,
        threshold_days: i64,
    ) -> Result<Option<PurgedTenant>, DomainError> {
        self.retry
            .run("tenant.purge", move || {
                self.purge_tenant_once(id, now, threshold_days)
            })
            .await
    }

    async fn list_with_owner_email(&self) -> Result<Vec<Tenant>, DomainError> {
        self.retry
            .run("tenant.list_with_owner_email", move || {
                self.list_with_owner_email_once()
            })
            .await
    }

    async fn events_for_tenant(
        &self,
        id: &TenantId,
    ) -> Result<Vec<SubscriptionEvent>, DomainError> {
        self.retry
            .run("tenant.events_for_tenant", move || self.events_for_tenant_once(id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> TenantRow {
        let now = Utc::now();
        TenantRow {
            id: Uuid::new_v4(),
            name: "Cafe".to_string(),
            slug: "cafe-one".to_string(),
            owner_email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            email_verified: false,
            status: "trial".to_string(),
            plan: None,
            trial_ends_at: now,
            subscription_start_date: None,
            subscription_end_date: None,
            is_active: true,
            last_payment_date: None,
            last_payment_id: None,
            created_at: now,
            updated_at: now,
            version: 3,
        }
    }

    #[test]
    fn row_converts_to_tenant() {
        let tenant = Tenant::try_from(row()).unwrap();
        assert_eq!(tenant.status, SubscriptionStatus::Trial);
        assert_eq!(tenant.slug.as_str(), "cafe-one");
        assert_eq!(tenant.version, 3);
    }

    #[test]
    fn unknown_status_is_reported_as_database_error() {
        let mut r = row();
        r.status = "paused".to_string();
        let err = Tenant::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn unknown_plan_is_reported_as_database_error() {
        let mut r = row();
        r.plan = Some("platinum".to_string());
        assert!(Tenant::try_from(r).is_err());
    }

    #[test]
    fn purge_predicate_names_every_condition() {
        let predicate = purge_predicate("$2");
        for clause in [
            "status = 'trial_expired'",
            "last_payment_date IS NULL",
            "is_active = FALSE",
            "created_at < $2",
            "trial_ends_at < $2",
        ] {
            assert!(predicate.contains(clause), "missing {}", clause);
        }
    }
}
