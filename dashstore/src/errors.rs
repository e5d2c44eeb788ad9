use thiserror::Error;

/// Caller-facing failures of the data layer.
///
/// Every message is safe to surface in a toast or banner as-is.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Not permitted: {0}")]
    Authorization(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Network request failed: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DataError::Authorization(_) => "authorization",
            DataError::Validation(_) => "validation",
            DataError::Network(_) => "network",
            DataError::NotFound(_) => "not_found",
            DataError::Config(_) => "config",
        }
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
