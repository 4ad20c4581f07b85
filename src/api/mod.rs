//! HTTP/JSON adapter. Thin handlers that validate input, enqueue the
//! actual work on the `JobQueue`, and return immediately.

mod handlers;
mod jobs;
mod state;

pub use jobs::JobQueue;
pub use state::ApiState;

use std::time::Duration;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/apps/deploy", post(handlers::deploy))
        .route("/apps", get(handlers::list_apps))
        .route("/apps/:id", get(handlers::get_app).delete(handlers::delete_app))
        .route("/apps/:id/start", post(handlers::start_app))
        .route("/apps/:id/stop", post(handlers::stop_app))
        .route("/apps/:id/restart", post(handlers::restart_app))
        .route("/apps/:id/clone", post(handlers::clone_app))
        .route("/apps/:id/config", patch(handlers::update_config))
        .route("/apps/:id/logs", get(handlers::get_app_logs))
        .route("/apps/:id/backups", get(handlers::list_backups))
        .route("/nodes", get(handlers::list_nodes))
        .route("/system/appliance", get(handlers::get_appliance))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
