use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::application::ports::{JobRepository, RepositoryError};
use crate::domain::{
    IdentityKey, Job, JobId, JobOptions, JobStatus, SourceDescriptor, SourceKind, Tier,
    TranscriptionResult,
};

const JOB_COLUMNS: &str = "id, owner_key, tier, source_kind, source_reference, options, priority, \
     requested_minutes, status, provider_id, warning, error_message, created_at, updated_at";

pub struct PgJobRepository {
    pool: PgPool,
}

impl PgJobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn query_failed(e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::QueryFailed(e.to_string())
}

fn job_from_row(row: &PgRow) -> Result<Job, RepositoryError> {
    let owner_key: String = row.try_get("owner_key").map_err(query_failed)?;
    let owner = IdentityKey::parse_storage_key(&owner_key)
        .ok_or_else(|| RepositoryError::CorruptRow(format!("bad owner key: {}", owner_key)))?;
    let tier = row
        .try_get::<String, _>("tier")
        .map_err(query_failed)?
        .parse::<Tier>()
        .map_err(RepositoryError::CorruptRow)?;
    let source_kind = row
        .try_get::<String, _>("source_kind")
        .map_err(query_failed)?
        .parse::<SourceKind>()
        .map_err(RepositoryError::CorruptRow)?;
    let status = row
        .try_get::<String, _>("status")
        .map_err(query_failed)?
        .parse::<JobStatus>()
        .map_err(RepositoryError::CorruptRow)?;
    let options: serde_json::Value = row.try_get("options").map_err(query_failed)?;
    let options: JobOptions = serde_json::from_value(options)
        .map_err(|e| RepositoryError::CorruptRow(e.to_string()))?;

    Ok(Job {
        id: JobId::from_uuid(row.try_get("id").map_err(query_failed)?),
        owner,
        tier,
        source: SourceDescriptor::new(
            source_kind,
            row.try_get::<String, _>("source_reference")
                .map_err(query_failed)?,
        ),
        options,
        priority: row.try_get("priority").map_err(query_failed)?,
        requested_minutes: row.try_get("requested_minutes").map_err(query_failed)?,
        status,
        provider_id: row.try_get("provider_id").map_err(query_failed)?,
        warning: row.try_get("warning").map_err(query_failed)?,
        error_message: row.try_get("error_message").map_err(query_failed)?,
        created_at: row.try_get("created_at").map_err(query_failed)?,
        updated_at: row.try_get("updated_at").map_err(query_failed)?,
    })
}

#[async_trait]
impl JobRepository for PgJobRepository {
    #[instrument(skip(self, job), fields(job_id = %job.id))]
    async fn create(&self, job: &Job) -> Result<(), RepositoryError> {
        let options = serde_json::to_value(&job.options).map_err(query_failed)?;

        sqlx::query(
            r#"
            INSERT INTO jobs (id, owner_key, tier, source_kind, source_reference, options,
                              priority, requested_minutes, status, provider_id, warning,
                              error_message, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.owner.storage_key())
        .bind(job.tier.as_str())
        .bind(job.source.kind.as_str())
        .bind(&job.source.reference)
        .bind(options)
        .bind(job.priority)
        .bind(job.requested_minutes)
        .bind(job.status.as_str())
        .bind(&job.provider_id)
        .bind(&job.warning)
        .bind(&job.error_message)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::ConstraintViolation(db.to_string())
            }
            other => query_failed(other),
        })?;

        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_by_id(&self, id: JobId) -> Result<Option<Job>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM jobs WHERE id = $1", JOB_COLUMNS))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(query_failed)?;

        row.as_ref().map(job_from_row).transpose()
    }

    #[instrument(skip(self, error_message), fields(job_id = %id, from = %from, to = %to))]
    async fn update_status(
        &self,
        id: JobId,
        from: JobStatus,
        to: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, error_message = COALESCE($2, error_message), updated_at = $3
            WHERE id = $4 AND status = $5
            "#,
        )
        .bind(to.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn set_priority(&self, id: JobId, priority: i64) -> Result<(), RepositoryError> {
        let updated = sqlx::query("UPDATE jobs SET priority = $1, updated_at = $2 WHERE id = $3")
            .bind(priority)
            .bind(Utc::now())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, warning), fields(job_id = %id))]
    async fn set_warning(&self, id: JobId, warning: &str) -> Result<(), RepositoryError> {
        let updated = sqlx::query("UPDATE jobs SET warning = $1, updated_at = $2 WHERE id = $3")
            .bind(warning)
            .bind(Utc::now())
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(query_failed)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, result), fields(job_id = %id, provider = provider_id))]
    async fn save_result(
        &self,
        id: JobId,
        provider_id: &str,
        result: &TranscriptionResult,
    ) -> Result<(), RepositoryError> {
        let payload = serde_json::to_value(result).map_err(query_failed)?;
        let updated = sqlx::query(
            "UPDATE jobs SET provider_id = $1, result = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(provider_id)
        .bind(payload)
        .bind(Utc::now())
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(query_failed)?;

        if updated.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(job_id = %id))]
    async fn get_result(&self, id: JobId) -> Result<Option<TranscriptionResult>, RepositoryError> {
        let payload: Option<Option<serde_json::Value>> =
            sqlx::query_scalar("SELECT result FROM jobs WHERE id = $1")
                .bind(id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(query_failed)?;

        match payload.flatten() {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RepositoryError::QueryFailed(e.to_string())),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<Job>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM jobs WHERE status = $1 ORDER BY created_at ASC",
            JOB_COLUMNS
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(query_failed)?;

        rows.iter().map(job_from_row).collect()
    }
}
