use thiserror::Error;

/// Error type definitions
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model is not fitted: {0}")]
    NotFitted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Computation error: {0}")]
    Computation(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("Inconsistent row count: expected {expected}, found {found}")]
    InconsistentRowCount { expected: usize, found: usize },

    #[error("Duplicate column name: {0}")]
    DuplicateColumnName(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
