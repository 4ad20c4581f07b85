use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("vhost validation failed: {0}")]
    ValidationFailed(String),

    #[error("proxy reload failed: {0}")]
    ReloadFailed(String),

    #[error("proxy is degraded and refuses new vhost operations until recovered")]
    Degraded,

    #[error("vhost not found: {0}")]
    NotFound(String),

    #[error("executor error: {0}")]
    Executor(#[from] crate::executor::ExecutorError),
}

impl ProxyError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::ValidationFailed(_) => "InvalidRequest",
            ProxyError::ReloadFailed(_) => "ProxyDegraded",
            ProxyError::Degraded => "ProxyDegraded",
            ProxyError::NotFound(_) => "NotFound",
            ProxyError::Executor(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;
