mod memory;
mod pg_pool;
mod repositories;

pub use memory::{
    InMemoryAbuseStore, InMemoryCounterStore, InMemoryJobRepository, InMemoryQueueStore,
    InMemoryQuotaRepository,
};
pub use repositories::{PgJobRepository, PgQuotaRepository};

pub use pg_pool::{create_pool, run_migrations};
