mod pg_job_repository;
mod pg_quota_repository;

pub use pg_job_repository::PgJobRepository;
pub use pg_quota_repository::PgQuotaRepository;
