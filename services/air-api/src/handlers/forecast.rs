//! Forecast handler.
//!
//! Merges the Open-Meteo pollutant and weather hourly series into
//! combined records starting at the current KST hour.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aq_common::{
    kst_floor_hour, merge_hourly, select_latest_index, AirError, ForecastRecord, PollutantHourly,
    WeatherHourly,
};

use crate::handlers::error_response;
use crate::state::AppState;

const MIN_HORIZON: usize = 6;
const MAX_HORIZON: usize = 120;
const DEFAULT_HORIZON: usize = 24;

/// Query parameters for the forecast endpoint.
#[derive(Debug, Deserialize)]
pub struct ForecastParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Forecast horizon in hours, clamped to 6..=120.
    pub horizon: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ForecastStation {
    id: String,
    name: String,
    distance_m: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ModelBlock {
    #[serde(rename = "type")]
    kind: String,
    version: String,
    mape: Option<f64>,
}

#[derive(Debug, Serialize)]
struct ForecastResponse {
    station: ForecastStation,
    horizon: String,
    issued_at: String,
    hourly: Vec<ForecastRecord>,
    model: ModelBlock,
}

/// GET /forecast
pub async fn forecast_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ForecastParams>,
) -> Response {
    let (lat, lon) = match super::nearest::validate_coords(params.lat, params.lon) {
        Ok(pair) => pair,
        Err(e) => return error_response(&e),
    };
    let horizon = clamp_horizon(params.horizon);

    let (aq, wx) = match tokio::join!(
        state.openmeteo.hourly_air(lat, lon),
        state.openmeteo.hourly_weather(lat, lon),
    ) {
        (Ok(aq), Ok(wx)) => (aq, wx),
        (Err(e), _) | (_, Err(e)) => return error_response(&e),
    };

    match build_response(lat, lon, horizon, &aq, &wx, Utc::now()) {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e),
    }
}

fn clamp_horizon(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_HORIZON)
        .clamp(MIN_HORIZON, MAX_HORIZON)
}

fn build_response(
    lat: f64,
    lon: f64,
    horizon: usize,
    aq: &PollutantHourly,
    wx: &WeatherHourly,
    now: DateTime<Utc>,
) -> Result<ForecastResponse, AirError> {
    let reference = kst_floor_hour(now);
    let start = select_latest_index(&aq.time, &reference)
        .ok_or(AirError::EmptyUpstream { provider: "openmeteo" })?;

    let hourly = merge_hourly(aq, wx, start, horizon);

    // Issue time is the first returned hour, not the wall clock.
    let issued_at = hourly
        .first()
        .map(|r| r.ts.clone())
        .unwrap_or_else(|| aq_common::to_second_precision(&reference));

    Ok(ForecastResponse {
        station: ForecastStation {
            id: format!("openmeteo-{:.2},{:.2}", lat, lon),
            name: "Open-Meteo grid".to_string(),
            distance_m: None,
        },
        // The advertised horizon is what was actually returned, which
        // may be shorter than requested when the series run out.
        horizon: format!("{}h", hourly.len()),
        issued_at,
        hourly,
        model: ModelBlock {
            kind: "openmeteo_hourly+weather_merge".to_string(),
            version: "v1".to_string(),
            mape: None,
        },
    })
}
