use thiserror::Error;

#[derive(Debug, Error)]
pub enum AllocatorError {
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("allocation conflict: {0}")]
    AllocationConflict(String),

    #[error("store error: {0}")]
    Store(#[from] crate::store::StoreError),

    #[error("hypervisor error: {0}")]
    Hypervisor(#[from] crate::hypervisor::HypervisorError),

    #[error("timed out waiting for DHCP lease")]
    DhcpLeaseTimeout,

    #[error("other: {0}")]
    Other(String),
}

impl AllocatorError {
    pub fn kind(&self) -> &'static str {
        match self {
            AllocatorError::ResourceExhausted(_) => "ResourceExhausted",
            AllocatorError::AllocationConflict(_) => "Conflict",
            AllocatorError::Store(_) => "Internal",
            AllocatorError::Hypervisor(_) => "HypervisorUnavailable",
            AllocatorError::DhcpLeaseTimeout => "Timeout",
            AllocatorError::Other(_) => "Internal",
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, AllocatorError::ResourceExhausted(_))
    }
}

pub type Result<T> = std::result::Result<T, AllocatorError>;
