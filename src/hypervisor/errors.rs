use thiserror::Error;

#[derive(Debug, Error)]
pub enum HypervisorError {
    #[error("hypervisor unavailable: {0}")]
    HypervisorUnavailable(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("resource conflict: {0}")]
    ResourceConflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid spec: {0}")]
    InvalidSpec(String),

    #[error("task {task_id} failed: {message}")]
    TaskFailed { task_id: String, message: String },

    #[error("no eligible node for scheduling")]
    NoEligibleNode,
}

impl HypervisorError {
    pub fn kind(&self) -> &'static str {
        match self {
            HypervisorError::HypervisorUnavailable(_) => "HypervisorUnavailable",
            HypervisorError::AuthFailed(_) => "InvalidRequest",
            HypervisorError::ResourceConflict(_) => "Conflict",
            HypervisorError::NotFound(_) => "NotFound",
            HypervisorError::InvalidSpec(_) => "InvalidRequest",
            HypervisorError::TaskFailed { .. } => "TaskFailed",
            HypervisorError::NoEligibleNode => "ResourceExhausted",
        }
    }
}

pub type Result<T> = std::result::Result<T, HypervisorError>;
