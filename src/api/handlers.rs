use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::error;
use uuid::Uuid;

use crate::catalog::ConfigOverrides;
use crate::error::{CoreError, Result};
use crate::orchestrator::DeployRequest;
use crate::store::models::{Application, DeploymentLog};

use super::state::ApiState;

#[derive(Debug, Deserialize)]
pub struct DeployBody {
    pub catalog_id: String,
    pub hostname: String,
    #[serde(default)]
    pub config_overrides: ConfigOverrides,
    pub owner: String,
    #[serde(default)]
    pub delete_on_failure: bool,
}

#[derive(Debug, Serialize)]
pub struct DeployAccepted {
    pub application_id: String,
}

pub async fn deploy(State(state): State<ApiState>, Json(body): Json<DeployBody>) -> Result<(StatusCode, Json<DeployAccepted>)> {
    let application_id = Uuid::new_v4().to_string();
    let request = DeployRequest {
        catalog_id: body.catalog_id,
        hostname: body.hostname,
        config_overrides: body.config_overrides,
        owner: body.owner,
        delete_on_failure: body.delete_on_failure,
    };

    let orchestrator = state.orchestrator.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = orchestrator.deploy(request, CancellationToken::new()).await {
            error!(error = %e, "deployment failed");
        }
    });

    Ok((StatusCode::ACCEPTED, Json(DeployAccepted { application_id })))
}

pub async fn list_apps(State(state): State<ApiState>) -> Result<Json<Vec<Application>>> {
    Ok(Json(state.store.list_applications().map_err(CoreError::Store)?))
}

pub async fn get_app(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<Application>> {
    Ok(Json(state.store.get_application(&id).map_err(CoreError::Store)?))
}

pub async fn get_app_logs(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<Vec<DeploymentLog>>> {
    Ok(Json(state.store.list_deployment_logs(&id).map_err(CoreError::Store)?))
}

#[derive(Debug, Serialize)]
pub struct Accepted {
    pub accepted: bool,
}

pub async fn start_app(State(state): State<ApiState>, Path(id): Path<String>) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.start(&id).await {
            error!(application_id = %id, error = %e, "start failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

pub async fn stop_app(State(state): State<ApiState>, Path(id): Path<String>) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.stop(&id).await {
            error!(application_id = %id, error = %e, "stop failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

pub async fn restart_app(State(state): State<ApiState>, Path(id): Path<String>) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.restart(&id).await {
            error!(application_id = %id, error = %e, "restart failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

#[derive(Debug, Deserialize)]
pub struct CloneBody {
    pub new_hostname: String,
}

pub async fn clone_app(State(state): State<ApiState>, Path(id): Path<String>, Json(body): Json<CloneBody>) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.clone_app(&id, &body.new_hostname).await {
            error!(application_id = %id, error = %e, "clone failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateConfigBody {
    pub cpu_cores: Option<u32>,
    pub memory_mb: Option<u64>,
    pub disk_gb: Option<u64>,
}

pub async fn update_config(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateConfigBody>,
) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.update_config(&id, body.cpu_cores, body.memory_mb, body.disk_gb).await {
            error!(application_id = %id, error = %e, "config update failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

pub async fn delete_app(State(state): State<ApiState>, Path(id): Path<String>) -> Result<(StatusCode, Json<Accepted>)> {
    let lifecycle = state.lifecycle.clone();
    state.jobs.enqueue(async move {
        if let Err(e) = lifecycle.delete(&id).await {
            error!(application_id = %id, error = %e, "delete failed");
        }
    });
    Ok((StatusCode::ACCEPTED, Json(Accepted { accepted: true })))
}

pub async fn list_nodes(State(state): State<ApiState>) -> Result<Json<Vec<crate::hypervisor::NodeStats>>> {
    Ok(Json(state.hypervisor.list_nodes().await.map_err(CoreError::Hypervisor)?))
}

pub async fn get_appliance(State(state): State<ApiState>) -> Result<Json<crate::store::models::ApplianceInfo>> {
    Ok(Json(state.appliance.get().await.map_err(CoreError::Appliance)?))
}

pub async fn list_backups(State(state): State<ApiState>, Path(id): Path<String>) -> Result<Json<Vec<crate::store::models::Backup>>> {
    Ok(Json(state.backups.list_for_application(&id).map_err(CoreError::Backup)?))
}
