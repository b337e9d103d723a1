//! Service status endpoints.

use axum::{extract::State, Json};
use serde::Serialize;
use xphub_shared::HealthStatus;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub environment: String,
}

pub async fn root(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "online",
        service: "xphub development backend",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.environment.clone(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let sockets = state.events.receiver_count();
    Json(HealthStatus {
        status: "healthy".to_string(),
        push_channel: Some(format!("running ({sockets} connected)")),
    })
}
