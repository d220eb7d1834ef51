//! Health handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub database: String,
    pub cache_hit_rate: f64,
}

/// GET /healthz
pub async fn health_handler(Extension(state): Extension<Arc<AppState>>) -> Json<HealthResponse> {
    let database = if state.store.is_some() {
        "ok".to_string()
    } else {
        "unconfigured".to_string()
    };

    Json(HealthResponse {
        ok: true,
        database,
        cache_hit_rate: state.openmeteo.cache().stats().hit_rate(),
    })
}
