use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("page not found: {0}")]
    NotFound(String),
    #[error("storage unavailable during {operation}: {cause:#}")]
    StorageUnavailable {
        operation: &'static str,
        cause: anyhow::Error,
    },
}

impl ServiceError {
    pub fn storage(operation: &'static str, cause: anyhow::Error) -> Self {
        ServiceError::StorageUnavailable { operation, cause }
    }
}
