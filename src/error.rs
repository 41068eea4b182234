use thiserror::Error;

/// Failures raised by a [`crate::model::store::RatingStore`] or
/// [`crate::model::store::HistoryStore`] implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Write conflict: {0}")]
    WriteConflict(String)
}

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Recalculation cancelled after {sessions_processed} of {sessions_total} sessions")]
    Cancelled {
        sessions_processed: usize,
        sessions_total: usize
    },

    #[error("Stored ratings carry no processed-through marker and no history; run a full rebuild")]
    UnknownResumePoint,

    #[error("Invalid group configuration: {0}")]
    InvalidGroupConfig(String),

    #[error("Invalid performance record: {0}")]
    InvalidRecord(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError)
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;
