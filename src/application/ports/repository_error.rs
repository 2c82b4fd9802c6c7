#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("database unavailable: {0}")]
    ConnectionFailed(String),
    #[error("query failed: {0}")]
    QueryFailed(String),
    #[error("job not found: {0}")]
    NotFound(String),
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
    /// A stored row no longer decodes into the domain model.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}
