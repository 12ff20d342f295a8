use thiserror::Error;

/// Generic error type used by service layer functions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The user lacks the role required for the operation.
    #[error("unauthorized")]
    Unauthorized,
    /// Malformed input, unknown parent or a cycle-forming parent assignment.
    #[error("{0}")]
    Validation(String),
    /// Requested category does not exist.
    #[error("not found")]
    NotFound,
    /// `sysname` collides with another category.
    #[error("{0}")]
    Conflict(String),
    /// The backing store failed.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Convenient alias for results returned from service functions.
pub type ServiceResult<T> = Result<T, ServiceError>;
