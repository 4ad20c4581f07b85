use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid deployment request: {0}")]
    InvalidRequest(String),

    #[error("hostname already in use: {0}")]
    HostnameConflict(String),

    #[error("catalog error: {0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("no eligible node for placement")]
    NoEligibleNode,

    #[error("allocator error: {0}")]
    Allocator(#[from] crate::allocator::AllocatorError),

    #[error("hypervisor error: {0}")]
    Hypervisor(#[from] crate::hypervisor::HypervisorError),

    #[error("executor error: {0}")]
    Executor(#[from] crate::executor::ExecutorError),

    #[error("proxy error: {0}")]
    Proxy(#[from] crate::proxy::ProxyError),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("deployment step {step} failed: {message}")]
    StepFailed { step: &'static str, message: String },

    #[error("deployment cancelled")]
    Cancelled,
}

impl OrchestratorError {
    pub fn kind(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidRequest(_) => "InvalidRequest",
            OrchestratorError::HostnameConflict(_) => "Conflict",
            OrchestratorError::Catalog(e) => e.kind(),
            OrchestratorError::NoEligibleNode => "ResourceExhausted",
            OrchestratorError::Allocator(e) => e.kind(),
            OrchestratorError::Hypervisor(e) => e.kind(),
            OrchestratorError::Executor(e) => e.kind(),
            OrchestratorError::Proxy(e) => e.kind(),
            OrchestratorError::Store(e) => e.kind(),
            OrchestratorError::StepFailed { .. } => "TaskFailed",
            OrchestratorError::Cancelled => "TaskFailed",
        }
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
