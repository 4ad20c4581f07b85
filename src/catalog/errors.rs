use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry not found: {0}")]
    NotFound(String),

    #[error("failed to read catalog directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog entry {0}: {1}")]
    Parse(String, String),
}

impl CatalogError {
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::NotFound(_) => "NotFound",
            CatalogError::Io(_) => "Internal",
            CatalogError::Parse(..) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
