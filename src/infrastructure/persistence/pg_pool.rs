use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::instrument;

use crate::application::ports::RepositoryError;
use crate::presentation::config::DatabaseSettings;

const MAX_BACKOFF: Duration = Duration::from_secs(8);

/// Connects with exponential backoff so the service can start alongside a
/// database that is still booting.
#[instrument(skip(settings, url), fields(max_connections = settings.max_connections))]
pub async fn create_pool(settings: &DatabaseSettings, url: &str) -> Result<PgPool, RepositoryError> {
    let options = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs.max(1)));
    let mut delay = Duration::from_millis(250);

    for attempt in 0..=settings.connect_retries {
        match options.clone().connect(url).await {
            Ok(pool) => {
                tracing::info!(attempt, "Database pool ready");
                return Ok(pool);
            }
            Err(e) if attempt < settings.connect_retries => {
                tracing::warn!(
                    error = %e,
                    attempt,
                    retry_in_ms = delay.as_millis() as u64,
                    "Database not reachable yet"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(MAX_BACKOFF);
            }
            Err(e) => return Err(RepositoryError::ConnectionFailed(e.to_string())),
        }
    }
    Err(RepositoryError::ConnectionFailed(
        "no connection attempts configured".to_string(),
    ))
}

/// Applies the embedded `migrations/` directory.
pub async fn run_migrations(pool: &PgPool) -> Result<(), RepositoryError> {
    sqlx::migrate!()
        .run(pool)
        .await
        .map_err(|e| RepositoryError::QueryFailed(format!("migrations: {}", e)))?;
    tracing::info!("Schema migrations applied");
    Ok(())
}
