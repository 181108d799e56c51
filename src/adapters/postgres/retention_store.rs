//! PostgreSQL implementation of RetentionStore.

use async_trait::async_trait;
use sqlx::{Executor, PgPool};

use super::errors::map_sqlx_error;
use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::retention::{DataDeletionLog, DataPurgeCounts};
use crate::ports::RetentionStore;

pub struct PostgresRetentionStore {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresRetentionStore {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn purge_once(&self, cutoff: Timestamp) -> Result<DataPurgeCounts, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        let orders = sqlx::query("DELETE FROM orders WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete old orders", e))?
            .rows_affected();

        let payments = sqlx::query("DELETE FROM payments WHERE verified_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete old payments", e))?
            .rows_affected();

        // Stale checkout orders are not counted in the audit row.
        sqlx::query("DELETE FROM checkout_orders WHERE created_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete old checkout orders", e))?;

        let events = sqlx::query("DELETE FROM subscription_events WHERE occurred_at < $1")
            .bind(cutoff.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to delete old events", e))?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit data purge", e))?;

        Ok(DataPurgeCounts {
            orders,
            payments,
            events,
        })
    }

    async fn record_once(&self, log: &DataDeletionLog) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO data_deletion_logs (
                orders_deleted, payments_deleted, events_deleted, days_retained, cutoff, deleted_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(log.counts.orders as i64)
        .bind(log.counts.payments as i64)
        .bind(log.counts.events as i64)
        .bind(log.days_retained)
        .bind(log.cutoff.as_datetime())
        .bind(log.deleted_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to record data deletion", e))?;
        Ok(())
    }

    async fn reclaim_once(&self) -> Result<(), DomainError> {
        // VACUUM cannot run inside a transaction block or as a prepared
        // statement, so it goes through the simple query protocol.
        (&self.pool)
            .execute("VACUUM ANALYZE orders, payments, subscription_events")
            .await
            .map_err(|e| map_sqlx_error("Failed to vacuum", e))?;
        Ok(())
    }
}

#[async_trait]
impl RetentionStore for PostgresRetentionStore {
    async fn purge_operational_data(
        &self,
        cutoff: Timestamp,
    ) -> Result<DataPurgeCounts, DomainError> {
        self.retry
            .run("retention.purge_operational_data", move || {
                self.purge_once(cutoff)
            })
            .await
    }

    async fn record_data_deletion(&self, log: &DataDeletionLog) -> Result<(), DomainError> {
        self.retry
            .run("retention.record_data_deletion", move || self.record_once(log))
            .await
    }

    async fn reclaim_storage(&self) -> Result<(), DomainError> {
        self.retry
            .run("retention.reclaim_storage", move || self.reclaim_once())
            .await
    }
}
