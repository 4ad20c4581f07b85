use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl BackupError {
    pub fn kind(&self) -> &'static str {
        match self {
            BackupError::Store(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, BackupError>;
