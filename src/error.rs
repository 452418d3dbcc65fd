use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reached maximum queue size of {capacity}")]
    QueueFull { capacity: usize },

    #[error("request queue worker is no longer running")]
    QueueClosed,

    #[error("queued operation was aborted before completing")]
    OperationAborted,

    #[error("failed to open database: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("failed to execute sql: {0}")]
    Statement(#[from] rusqlite::Error),

    #[error("failed to build sql statement: {0}")]
    InvalidStatement(String),

    #[error(
        "found {matches} averages for plug {plug_id} at bucket {bucket_start_ms} ({duration_ms} ms), expected at most one"
    )]
    ConsistencyViolation {
        plug_id: i64,
        bucket_start_ms: i64,
        duration_ms: i64,
        matches: usize,
    },

    #[error("average duration must be positive, got {0} ms")]
    InvalidDuration(i64),

    #[error("plug name must not be empty")]
    InvalidPlugName,

    #[error("{metric} must be a finite number")]
    NonFiniteMetric { metric: &'static str },

    #[error("request queue capacity must be at least one")]
    InvalidCapacity,

    #[error("failed to start request queue worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}
