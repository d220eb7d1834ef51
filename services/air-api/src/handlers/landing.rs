//! Landing page handler.

use axum::Json;
use serde_json::{json, Value};

/// GET /
pub async fn landing_handler() -> Json<Value> {
    Json(json!({
        "service": "air-api",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/nearest", "/forecast", "/geo/address", "/geo/reverse", "/healthz"],
    }))
}
