//! PostgreSQL read side of the orders table for owner reports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::errors::map_sqlx_error;
use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, TenantId, Timestamp};
use crate::domain::reporting::ReportOrder;
use crate::ports::OrderReader;

pub struct PostgresOrderReader {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresOrderReader {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn orders_between_once(
        &self,
        tenant_id: &TenantId,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<ReportOrder>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, table_number, status, total_minor, created_at
            FROM orders
            WHERE tenant_id = $1 AND created_at >= $2 AND created_at < $3
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(since.as_datetime())
        .bind(until.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to fetch orders", e))?;

        Ok(rows.into_iter().map(ReportOrder::from).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i64,
    table_number: String,
    status: String,
    total_minor: i64,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for ReportOrder {
    fn from(row: OrderRow) -> Self {
        ReportOrder {
            order_id: row.id,
            table_number: row.table_number,
            status: row.status,
            total_minor: row.total_minor,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl OrderReader for PostgresOrderReader {
    async fn orders_between(
        &self,
        tenant_id: &TenantId,
        since: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<ReportOrder>, DomainError> {
        self.retry
            .run("orders.between", move || {
                self.orders_between_once(tenant_id, since, until)
            })
            .await
    }
}
