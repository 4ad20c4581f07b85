use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("ssh unavailable: {0}")]
    SshUnavailable(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(std::time::Duration),

    #[error("command failed: exit code {exit_code}, stderr: {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("host key verification failed for {0}")]
    HostKeyMismatch(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl ExecutorError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutorError::SshUnavailable(_) => "SSHUnavailable",
            ExecutorError::CommandTimeout(_) => "Timeout",
            ExecutorError::CommandFailed { .. } => "TaskFailed",
            ExecutorError::Cancelled => "Internal",
            ExecutorError::HostKeyMismatch(_) => "SSHUnavailable",
            ExecutorError::InvalidArgument(_) => "InvalidRequest",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExecutorError>;
