//! PostgreSQL implementation of OtpRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use super::errors::map_sqlx_error;
use crate::adapters::retry::RetryPolicy;
use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::otp::{OtpCode, OtpToken};
use crate::domain::subscription::normalize_email;
use crate::ports::OtpRepository;

pub struct PostgresOtpRepository {
    pool: PgPool,
    retry: RetryPolicy,
}

impl PostgresOtpRepository {
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    async fn replace_once(&self, token: &OtpToken) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("Failed to begin transaction", e))?;

        sqlx::query("DELETE FROM otp_tokens WHERE email = $1 AND used = FALSE")
            .bind(&token.email)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("Failed to invalidate previous codes", e))?;

        sqlx::query(
            r#"
            INSERT INTO otp_tokens (id, email, code, expires_at, used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id.as_uuid())
        .bind(&token.email)
        .bind(token.code.as_str())
        .bind(token.expires_at.as_datetime())
        .bind(token.used)
        .bind(token.created_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("Failed to store code", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("Failed to commit code", e))
    }

    async fn consume_once(
        &self,
        email: &str,
        code: &OtpCode,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        // One conditional update: of two concurrent submissions only one
        // sees `used = FALSE`.
        let result = sqlx::query(
            r#"
            UPDATE otp_tokens SET used = TRUE
            WHERE email = $1 AND code = $2 AND used = FALSE AND expires_at > $3
            "#,
        )
        .bind(email)
        .bind(code.as_str())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("Failed to consume code", e))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OtpRepository for PostgresOtpRepository {
    async fn replace_for_email(&self, token: &OtpToken) -> Result<(), DomainError> {
        self.retry
            .run("otp.replace_for_email", move || self.replace_once(token))
            .await
    }

    async fn consume(
        &self,
        email: &str,
        code: &OtpCode,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        let email = email.as_str();
        self.retry
            .run("otp.consume", move || self.consume_once(email, code, now))
            .await
    }
}
