use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuotebookError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type Result<T> = std::result::Result<T, QuotebookError>;
