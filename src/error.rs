//! Crate-wide error taxonomy. Every component keeps its own `thiserror`
//! enum with a `kind()` method; `CoreError` wraps whichever one crossed
//! the API boundary and renders the shared `{error: {kind, message}}`
//! response shape.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{0}")]
    Orchestrator(#[from] crate::orchestrator::OrchestratorError),

    #[error("{0}")]
    Lifecycle(#[from] crate::lifecycle::LifecycleError),

    #[error("{0}")]
    Allocator(#[from] crate::allocator::AllocatorError),

    #[error("{0}")]
    Hypervisor(#[from] crate::hypervisor::HypervisorError),

    #[error("{0}")]
    Executor(#[from] crate::executor::ExecutorError),

    #[error("{0}")]
    Proxy(#[from] crate::proxy::ProxyError),

    #[error("{0}")]
    Store(#[from] crate::store::StoreError),

    #[error("{0}")]
    Catalog(#[from] crate::catalog::CatalogError),

    #[error("{0}")]
    Appliance(#[from] crate::appliance::ApplianceError),

    #[error("{0}")]
    Backup(#[from] crate::backup::BackupError),

    #[error("{0}")]
    InvalidRequest(String),
}

impl CoreError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoreError::Orchestrator(e) => e.kind(),
            CoreError::Lifecycle(e) => e.kind(),
            CoreError::Allocator(e) => e.kind(),
            CoreError::Hypervisor(e) => e.kind(),
            CoreError::Executor(e) => e.kind(),
            CoreError::Proxy(e) => e.kind(),
            CoreError::Store(e) => e.kind(),
            CoreError::Catalog(e) => e.kind(),
            CoreError::Appliance(e) => e.kind(),
            CoreError::Backup(e) => e.kind(),
            CoreError::InvalidRequest(_) => "InvalidRequest",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind() {
            "InvalidRequest" => StatusCode::BAD_REQUEST,
            "NotFound" => StatusCode::NOT_FOUND,
            "Conflict" | "InvalidState" => StatusCode::CONFLICT,
            "ResourceExhausted" => StatusCode::SERVICE_UNAVAILABLE,
            "SSHUnavailable" | "HypervisorUnavailable" => StatusCode::BAD_GATEWAY,
            "TaskFailed" => StatusCode::UNPROCESSABLE_ENTITY,
            "ProxyDegraded" => StatusCode::SERVICE_UNAVAILABLE,
            "Timeout" => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();
        let message = self.to_string();

        let body = Json(json!({
            "error": {
                "kind": kind,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
