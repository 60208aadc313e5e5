use std::sync::Arc;

use axum::{extract::State, Json};
use fluxio_core::CloudProvider;
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: &'static str,
    pub aws_configured: bool,
    pub gcp_configured: bool,
}

/// Service health and per-cloud configuration readiness
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Service health", body = HealthResponse))
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        aws_configured: state.queues.is_configured(CloudProvider::Aws),
        gcp_configured: state.queues.is_configured(CloudProvider::Gcp),
    })
}
