//! Nearest reading handler.
//!
//! Resolves the closest station reading from the store, or falls
//! back to Open-Meteo model values when the store has nothing usable.

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
};
use axum::Json;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use aq_common::{
    badges, grade, kst_floor_hour, select_latest_index, to_second_precision, AirError,
    PollutantHourly, StationKind,
};
use storage::{AirStore, NearestReading};

use crate::handlers::error_response;
use crate::state::AppState;

/// Query parameters for the nearest endpoint.
#[derive(Debug, Deserialize)]
pub struct NearestParams {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// Resolution source: db (default), model, or auto.
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Db,
    Model,
    Auto,
}

impl Mode {
    fn parse(s: Option<&str>) -> Result<Self, AirError> {
        match s.unwrap_or("db") {
            "db" => Ok(Mode::Db),
            "model" => Ok(Mode::Model),
            "auto" => Ok(Mode::Auto),
            other => Err(AirError::InvalidParameter {
                param: "source".to_string(),
                message: format!("unknown source '{}', expected db|model|auto", other),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct StationBlock {
    id: i64,
    name: String,
    provider: String,
    kind: String,
    lat: Option<f64>,
    lon: Option<f64>,
    distance_m: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NearestResponse {
    station: StationBlock,
    /// KST, second precision.
    ts: String,
    pm10: Option<f64>,
    pm25: Option<f64>,
    unit_pm10: Option<String>,
    unit_pm25: Option<String>,
    o3: Option<f64>,
    no2: Option<f64>,
    so2: Option<f64>,
    co: Option<f64>,
    cai_grade: Option<u8>,
    badges: Vec<String>,
    source: &'static str,
}

/// GET /nearest
pub async fn nearest_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<NearestParams>,
) -> Response {
    let (lat, lon) = match validate_coords(params.lat, params.lon) {
        Ok(pair) => pair,
        Err(e) => return error_response(&e),
    };
    let mode = match Mode::parse(params.source.as_deref()) {
        Ok(m) => m,
        Err(e) => return error_response(&e),
    };

    if mode != Mode::Model {
        match from_store(&state, lat, lon).await {
            Ok(Some(resp)) => return Json(resp).into_response(),
            // An unreachable or empty store is a no-data outcome in
            // store-only mode, never a hard error.
            Ok(None) if mode == Mode::Db => return error_response(&AirError::NoData),
            Ok(None) => {}
            Err(e) if mode == Mode::Db => {
                warn!(error = %e, "Store lookup failed");
                return error_response(&store_only_outcome(e));
            }
            Err(e) => warn!(error = %e, "Store lookup failed, falling back to model"),
        }
    }

    match from_model(&state, lat, lon).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => error_response(&e),
    }
}

pub(crate) fn validate_coords(lat: Option<f64>, lon: Option<f64>) -> Result<(f64, f64), AirError> {
    let lat = lat.ok_or_else(|| missing("lat"))?;
    let lon = lon.ok_or_else(|| missing("lon"))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(out_of_range("lat", "-90..=90"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(out_of_range("lon", "-180..=180"));
    }
    Ok((lat, lon))
}

fn missing(param: &str) -> AirError {
    AirError::InvalidParameter {
        param: param.to_string(),
        message: "required".to_string(),
    }
}

fn out_of_range(param: &str, range: &str) -> AirError {
    AirError::InvalidParameter {
        param: param.to_string(),
        message: format!("out of range, expected {}", range),
    }
}

/// In store-only mode a store that cannot answer is indistinguishable
/// from a store with nothing to say: both map to the no-data outcome.
fn store_only_outcome(err: AirError) -> AirError {
    match err {
        AirError::Database(_) | AirError::ConfigMissing(_) => AirError::NoData,
        other => other,
    }
}

async fn from_store(
    state: &AppState,
    lat: f64,
    lon: f64,
) -> Result<Option<NearestResponse>, AirError> {
    let Some(store) = &state.store else {
        return Err(AirError::ConfigMissing("DATABASE_URL".to_string()));
    };
    let reading = store.nearest_reading(lat, lon).await?;
    Ok(reading.map(db_response))
}

fn db_response(reading: NearestReading) -> NearestResponse {
    let cai_grade = grade(reading.pm10, reading.pm25);
    let badge_list = badges(reading.kind, reading.pm10, reading.pm25);

    NearestResponse {
        station: StationBlock {
            id: reading.station_id,
            name: reading.name,
            provider: reading.provider,
            kind: reading.kind.as_str().to_string(),
            lat: reading.lat,
            lon: reading.lon,
            distance_m: Some(reading.distance_m),
        },
        ts: kst_display(reading.ts),
        pm10: reading.pm10,
        pm25: reading.pm25,
        unit_pm10: reading.unit_pm10,
        unit_pm25: reading.unit_pm25,
        o3: None,
        no2: None,
        so2: None,
        co: None,
        cai_grade,
        badges: badge_list,
        source: "db",
    }
}

async fn from_model(state: &AppState, lat: f64, lon: f64) -> Result<NearestResponse, AirError> {
    let hourly = state.openmeteo.hourly_air(lat, lon).await?;
    model_response(lat, lon, &hourly, Utc::now())
}

fn model_response(
    lat: f64,
    lon: f64,
    hourly: &PollutantHourly,
    now: DateTime<Utc>,
) -> Result<NearestResponse, AirError> {
    let reference = kst_floor_hour(now);
    let idx = select_latest_index(&hourly.time, &reference)
        .ok_or(AirError::EmptyUpstream { provider: "openmeteo" })?;

    let at = |arr: &[Option<f64>]| arr.get(idx).copied().flatten();
    let pm10 = at(&hourly.pm10);
    let pm25 = at(&hourly.pm25);

    Ok(NearestResponse {
        station: StationBlock {
            id: 0,
            name: "Open-Meteo analysis".to_string(),
            provider: "OPENMETEO".to_string(),
            kind: StationKind::Model.as_str().to_string(),
            lat: Some(lat),
            lon: Some(lon),
            distance_m: None,
        },
        ts: to_second_precision(&hourly.time[idx]),
        pm10,
        pm25,
        unit_pm10: Some("ug/m3".to_string()),
        unit_pm25: Some("ug/m3".to_string()),
        o3: at(&hourly.o3),
        no2: at(&hourly.no2),
        so2: at(&hourly.so2),
        co: at(&hourly.co),
        cai_grade: grade(pm10, pm25),
        badges: badges(StationKind::Model, pm10, pm25),
        source: "model",
    })
}

/// Format a UTC instant as a KST wall-clock timestamp.
fn kst_display(ts: DateTime<Utc>) -> String {
    // 9 * 3600 is always in range
    let kst = FixedOffset::east_opt(9 * 3600).unwrap();
    ts.with_timezone(&kst).format("%Y-%m-%dT%H:%M:%S").to_string()
}
