use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid state transition: application is {current}, requested operation requires {expected}")]
    InvalidState { current: String, expected: String },

    #[error("application not found: {0}")]
    NotFound(String),

    #[error("hostname already in use: {0}")]
    HostnameConflict(String),

    #[error("application stack did not become reachable in time")]
    StackNotReady,

    #[error("at least one field must be supplied for an update")]
    EmptyUpdate,

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("hypervisor error: {0}")]
    Hypervisor(#[from] crate::hypervisor::HypervisorError),

    #[error("executor error: {0}")]
    Executor(#[from] crate::executor::ExecutorError),

    #[error("allocator error: {0}")]
    Allocator(#[from] crate::allocator::AllocatorError),

    #[error("proxy error: {0}")]
    Proxy(#[from] crate::proxy::ProxyError),

    #[error("lock error: {0}")]
    Lock(#[from] crate::system::LockerError),
}

impl LifecycleError {
    pub fn kind(&self) -> &'static str {
        match self {
            LifecycleError::InvalidState { .. } => "InvalidState",
            LifecycleError::NotFound(_) => "NotFound",
            LifecycleError::HostnameConflict(_) => "Conflict",
            LifecycleError::StackNotReady => "TaskFailed",
            LifecycleError::EmptyUpdate => "InvalidRequest",
            LifecycleError::Store(e) => e.kind(),
            LifecycleError::Hypervisor(e) => e.kind(),
            LifecycleError::Executor(e) => e.kind(),
            LifecycleError::Allocator(e) => e.kind(),
            LifecycleError::Proxy(e) => e.kind(),
            LifecycleError::Lock(_) => "Internal",
        }
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, LifecycleError::InvalidState { .. })
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
