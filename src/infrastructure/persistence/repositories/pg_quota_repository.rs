use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::PgPool;
use tracing::instrument;

use crate::application::ports::{QuotaRepository, RepositoryError, UsageDelta, UsageSnapshot};
use crate::domain::IdentityKey;

/// Usage counters keyed by calendar window. A row for a new day or month
/// starts at zero, so windows reset without explicit deletes.
pub struct PgQuotaRepository {
    pool: PgPool,
}

impl PgQuotaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaRepository for PgQuotaRepository {
    #[instrument(skip(self), fields(identity = %identity))]
    async fn usage(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
    ) -> Result<UsageSnapshot, RepositoryError> {
        let key = identity.storage_key();

        let requests: Option<i32> = sqlx::query_scalar(
            "SELECT requests FROM daily_usage WHERE identity_key = $1 AND day = $2",
        )
        .bind(&key)
        .bind(day)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let minutes: Option<(f64, f64)> = sqlx::query_as(
            r#"
            SELECT minutes, high_accuracy_minutes
            FROM monthly_usage
            WHERE identity_key = $1 AND month_start = $2
            "#,
        )
        .bind(&key)
        .bind(month_start)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        let (monthly_minutes, monthly_high_accuracy_minutes) = minutes.unwrap_or((0.0, 0.0));
        Ok(UsageSnapshot {
            daily_requests: requests.unwrap_or(0).max(0) as u32,
            monthly_minutes,
            monthly_high_accuracy_minutes,
        })
    }

    #[instrument(skip(self, delta), fields(identity = %identity))]
    async fn record(
        &self,
        identity: &IdentityKey,
        day: NaiveDate,
        month_start: NaiveDate,
        delta: UsageDelta,
    ) -> Result<(), RepositoryError> {
        let key = identity.storage_key();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO daily_usage (identity_key, day, requests)
            VALUES ($1, $2, $3)
            ON CONFLICT (identity_key, day)
            DO UPDATE SET requests = daily_usage.requests + EXCLUDED.requests
            "#,
        )
        .bind(&key)
        .bind(day)
        .bind(delta.requests as i32)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO monthly_usage (identity_key, month_start, minutes, high_accuracy_minutes)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (identity_key, month_start)
            DO UPDATE SET minutes = monthly_usage.minutes + EXCLUDED.minutes,
                          high_accuracy_minutes =
                              monthly_usage.high_accuracy_minutes + EXCLUDED.high_accuracy_minutes
            "#,
        )
        .bind(&key)
        .bind(month_start)
        .bind(delta.minutes)
        .bind(delta.high_accuracy_minutes)
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| RepositoryError::QueryFailed(e.to_string()))?;
        Ok(())
    }
}
