mod abuse_store;
mod counter_store;
mod job_repository;
mod queue_store;
mod quota_repository;

pub use abuse_store::InMemoryAbuseStore;
pub use counter_store::InMemoryCounterStore;
pub use job_repository::InMemoryJobRepository;
pub use queue_store::InMemoryQueueStore;
pub use quota_repository::InMemoryQuotaRepository;
