use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("other: {0}")]
    Other(String),
}

impl StoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::Sqlite(_) => "Internal",
            StoreError::Serialization(_) => "Internal",
            StoreError::NotFound(_) => "NotFound",
            StoreError::Conflict(_) => "Conflict",
            StoreError::Other(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
