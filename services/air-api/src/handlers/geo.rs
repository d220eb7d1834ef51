//! Geocoding handlers backed by Kakao Local.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use aq_common::AirError;

use crate::handlers::error_response;
use crate::state::AppState;

const MIN_QUERY_CHARS: usize = 2;

/// Query parameters for forward address search.
#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub q: Option<String>,
}

/// Query parameters for reverse lookup.
#[derive(Debug, Deserialize)]
pub struct ReverseParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

pub async fn address_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<AddressParams>,
) -> Response {
    let query = match validate_query(params.q.as_deref()) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };
    let Some(kakao) = &state.kakao else {
        return error_response(&AirError::ConfigMissing("KAKAO_REST_KEY".to_string()));
    };

    match kakao.address(query).await {
        Ok(place) => Json(place).into_response(),
        Err(err) => {
            if !err.is_no_data() {
                warn!(error = %err, query, "Address lookup failed");
            }
            error_response(&err)
        }
    }
}

pub async fn reverse_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ReverseParams>,
) -> Response {
    let (lat, lon) = match super::nearest::validate_coords(params.lat, params.lon) {
        Ok(pair) => pair,
        Err(e) => return error_response(&e),
    };
    let Some(kakao) = &state.kakao else {
        return error_response(&AirError::ConfigMissing("KAKAO_REST_KEY".to_string()));
    };

    match kakao.reverse(lat, lon).await {
        Ok(place) => Json(place).into_response(),
        Err(err) => {
            if !err.is_no_data() {
                warn!(error = %err, lat, lon, "Reverse lookup failed");
            }
            error_response(&err)
        }
    }
}

fn validate_query(q: Option<&str>) -> Result<&str, AirError> {
    let q = q.map(str::trim).unwrap_or("");
    if q.chars().count() < MIN_QUERY_CHARS {
        return Err(AirError::InvalidParameter {
            param: "q".to_string(),
            message: format!("must be at least {} characters", MIN_QUERY_CHARS),
        });
    }
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn query_must_carry_at_least_two_characters() {
        assert!(validate_query(None).is_err());
        assert!(validate_query(Some(" ")).is_err());
        assert!(validate_query(Some("서")).is_err());
        assert_eq!(validate_query(Some(" 서울 ")).unwrap(), "서울");
    }

    #[test]
    fn short_query_maps_to_bad_request() {
        let err = validate_query(Some("a")).unwrap_err();
        assert_eq!(error_response(&err).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn missing_key_maps_to_service_unavailable() {
        let err = AirError::ConfigMissing("KAKAO_REST_KEY".to_string());
        assert_eq!(
            error_response(&err).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
