//! HTTP handlers.

pub mod forecast;
pub mod geo;
pub mod health;
pub mod landing;
pub mod nearest;

use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Serialize;

use aq_common::AirError;

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Map a domain error onto an HTTP response. The no-data outcome is
/// an empty 204, not an error payload.
pub fn error_response(err: &AirError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_no_data() {
        return Response::builder()
            .status(StatusCode::NO_CONTENT)
            .body(axum::body::Body::empty())
            .unwrap_or_default();
    }

    let body = serde_json::to_string(&ErrorBody {
        error: err.to_string(),
    })
    .unwrap_or_default();

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap_or_default()
}
