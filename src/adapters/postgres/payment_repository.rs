//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::errors::{map_sqlx_error, unique_violation};
use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, ErrorCode, TenantId, Timestamp};
use crate::domain::subscription::{
    CheckoutIntent, PaymentRecord, PaymentVerificationStatus, SubscriptionPlan,
};
use crate::ports::PaymentRepository;

pub struct PostgresPaymentRepository {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    payment_id: String,
    tenant_id: Uuid,
    order_id: String,
    plan: String,
    amount_minor: i64,
    currency: String,
    status: String,
    verified_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for PaymentRecord {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let plan = row.plan.parse::<SubscriptionPlan>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored plan: {}", e))
        })?;
        let status = match row.status.as_str() {
            "verified" => PaymentVerificationStatus::Verified,
            other => {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!("Invalid stored payment status: {}", other),
                ))
            }
        };

        Ok(PaymentRecord {
            tenant_id: TenantId::from_uuid(row.tenant_id),
            order_id: row.order_id,
            payment_id: row.payment_id,
            plan,
            amount_minor: row.amount_minor,
            currency: row.currency,
            status,
            verified_at: Timestamp::from_datetime(row.verified_at),
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CheckoutRow {
    order_id: String,
    tenant_id: Uuid,
    plan: String,
    amount_minor: i64,
    currency: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CheckoutRow> for CheckoutIntent {
    type Error = DomainError;

    fn try_from(row: CheckoutRow) -> Result<Self, Self::Error> {
        let plan = row.plan.parse::<SubscriptionPlan>().map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid stored plan: {}", e))
        })?;

        Ok(CheckoutIntent {
            order_id: row.order_id,
            tenant_id: TenantId::from_uuid(row.tenant_id),
            plan,
            amount_minor: row.amount_minor,
            currency: row.currency,
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

impl PostgresPaymentRepository {
    async fn record_checkout_once(&self, intent: &CheckoutIntent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO checkout_orders (
                order_id, tenant_id, plan, amount_minor, currency, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&intent.order_id)
        .bind(intent.tenant_id.as_uuid())
        .bind(intent.plan.as_str())
        .bind(intent.amount_minor)
        .bind(&intent.currency)
        .bind(intent.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some("checkout_orders_order_id_key") => DomainError::new(
                ErrorCode::DuplicatePayment,
                format!("Order {} has already been recorded", intent.order_id),
            ),
            _ => map_sqlx_error("Failed to record checkout order", e),
        })?;
        Ok(())
    }

    async fn find_checkout_once(
        &self,
        order_id: &str,
    ) -> Result<Option<CheckoutIntent>, DomainError> {
        let row: Option<CheckoutRow> = sqlx::query_as(
            r#"
            SELECT order_id, tenant_id, plan, amount_minor, currency, created_at
            FROM checkout_orders
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch checkout order", e))?;

        row.map(CheckoutIntent::try_from).transpose()
    }

    async fn record_once(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                payment_id, tenant_id, order_id, plan, amount_minor, currency, status, verified_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.payment_id)
        .bind(record.tenant_id.as_uuid())
        .bind(&record.order_id)
        .bind(record.plan.as_str())
        .bind(record.amount_minor)
        .bind(&record.currency)
        .bind(record.status.as_str())
        .bind(record.verified_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| match unique_violation(&e) {
            Some("payments_payment_id_key") => DomainError::new(
                ErrorCode::DuplicatePayment,
                format!("Payment {} has already been recorded", record.payment_id),
            ),
            _ => map_sqlx_error("Failed to record payment", e),
        })?;
        Ok(())
    }

    async fn find_once(&self, payment_id: &str) -> Result<Option<PaymentRecord>, DomainError> {
        let row: Option<PaymentRow> = sqlx::query_as(
            r#"
            SELECT payment_id, tenant_id, order_id, plan, amount_minor, currency, status, verified_at
            FROM payments
            WHERE payment_id = $1
            "#,
        )
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch payment", e))?;

        row.map(PaymentRecord::try_from).transpose()
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn record_verified(&self, record: &PaymentRecord) -> Result<(), DomainError> {
        self.retry
            .run("payment.record_verified", move || self.record_once(record))
            .await
    }

    async fn find_by_payment_id(
        &self,
        payment_id: &str,
    ) -> Result<Option<PaymentRecord>, DomainError> {
        self.retry
            .run("payment.find_by_payment_id", move || self.find_once(payment_id))
            .await
    }

    async fn record_checkout(&self, intent: &CheckoutIntent) -> Result<(), DomainError> {
        self.retry
            .run("payment.record_checkout", move || self.record_checkout_once(intent))
            .await
    }

    async fn find_checkout(&self, order_id: &str) -> Result<Option<CheckoutIntent>, DomainError> {
        self.retry
            .run("payment.find_checkout", move || self.find_checkout_once(order_id))
            .await
    }
}
