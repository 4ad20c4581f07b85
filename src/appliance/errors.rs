use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplianceError {
    #[error("bootstrap step failed: {0}")]
    BootstrapFailed(String),

    #[error("health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("appliance not yet initialized")]
    NotInitialized,

    #[error("executor error: {0}")]
    Executor(#[from] crate::executor::ExecutorError),

    #[error("hypervisor error: {0}")]
    Hypervisor(#[from] crate::hypervisor::HypervisorError),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

impl ApplianceError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApplianceError::BootstrapFailed(_) => "Internal",
            ApplianceError::HealthCheckFailed(_) => "ProxyDegraded",
            ApplianceError::NotInitialized => "Conflict",
            ApplianceError::Executor(e) => e.kind(),
            ApplianceError::Hypervisor(e) => e.kind(),
            ApplianceError::Store(_) => "Internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, ApplianceError>;
