use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::{scheduler::AvailabilityPolicy, ApiState};

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timezone: &'static str,
    availability_policy: AvailabilityPolicy,
}

#[derive(Serialize)]
struct VersionResponse {
    version: &'static str,
}

async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let settings = state.scheduler.settings();
    Json(HealthResponse {
        status: "ok",
        timezone: settings.timezone.name(),
        availability_policy: settings.policy,
    })
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/version", get(version))
}
