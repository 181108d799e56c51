//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresTenantRepository` - Tenants, transitions, purges, audit events
//! - `PostgresOtpRepository` - One live verification code per email
//! - `PostgresPaymentRepository` - Write-once verified payments
//! - `PostgresRetentionStore` - Window-based deletion of operational data
//! - `PostgresOrderReader` - Order projection for daily reports
//!
//! Every adapter wraps its statements in the shared `RetryPolicy`.

mod errors;
mod order_reader;
mod otp_repository;
mod payment_repository;
mod retention_store;
mod tenant_repository;

pub use order_reader::PostgresOrderReader;
pub use otp_repository::PostgresOtpRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use retention_store::PostgresRetentionStore;
pub use tenant_repository::PostgresTenantRepository;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, ErrorCode};

/// Opens the connection pool.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<PgPool, DomainError> {
    let options: PgConnectOptions = database_url.parse().map_err(|e| {
        DomainError::new(ErrorCode::DatabaseError, format!("Invalid database URL: {}", e))
    })?;

    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| errors::map_sqlx_error("Failed to connect to Postgres", e))
}

/// Applies pending schema migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DomainError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DomainError::new(ErrorCode::DatabaseError, format!("Migration failed: {}", e)))
}
