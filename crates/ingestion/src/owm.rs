//! OpenWeatherMap air-pollution grid feed normalizer.
//!
//! A gridded model provider: one synthetic grid-point station per
//! sampled coordinate. Both the current-conditions payload and the
//! hourly forecast payload share the same `list` entry shape.

use chrono::{TimeZone, Utc};
use serde_json::Value;

use aq_common::{SourceKind, SourceQuality, StationKind};
use storage::{IngestRow, MeasurementRecord, SourceRecord, StationRecord};

pub const PROVIDER: &str = "OWM";
pub const FEED_URL: &str = "https://api.openweathermap.org/data/2.5/air_pollution";

/// Grid spacing reported for the synthetic stations, in km.
const GRID_RES_KM: f64 = 5.0;

/// One sampled model coordinate.
#[derive(Debug, Clone, Copy)]
pub struct GridTarget {
    pub name: &'static str,
    pub lat: f64,
    pub lon: f64,
    pub city: &'static str,
}

/// Sampled coordinates (the deployment's KR coverage).
pub const TARGETS: &[GridTarget] = &[
    GridTarget { name: "OWM Seoul(37.5665,126.9780)", lat: 37.5665, lon: 126.9780, city: "Seoul" },
    GridTarget { name: "OWM Incheon(37.4563,126.7052)", lat: 37.4563, lon: 126.7052, city: "Incheon" },
    GridTarget { name: "OWM Suwon(37.2636,127.0286)", lat: 37.2636, lon: 127.0286, city: "Suwon" },
    GridTarget { name: "OWM Uijeongbu(37.7381,127.0337)", lat: 37.7381, lon: 127.0337, city: "Uijeongbu" },
    GridTarget { name: "OWM Chuncheon(37.8813,127.7298)", lat: 37.8813, lon: 127.7298, city: "Chuncheon" },
    GridTarget { name: "OWM Gangneung(37.7519,128.8761)", lat: 37.7519, lon: 128.8761, city: "Gangneung" },
    GridTarget { name: "OWM Daejeon(36.3504,127.3845)", lat: 36.3504, lon: 127.3845, city: "Daejeon" },
    GridTarget { name: "OWM Cheongju(36.6424,127.4890)", lat: 36.6424, lon: 127.4890, city: "Cheongju" },
    GridTarget { name: "OWM Jeonju(35.8242,127.1479)", lat: 35.8242, lon: 127.1479, city: "Jeonju" },
    GridTarget { name: "OWM Gwangju(35.1595,126.8526)", lat: 35.1595, lon: 126.8526, city: "Gwangju" },
    GridTarget { name: "OWM Daegu(35.8714,128.6014)", lat: 35.8714, lon: 128.6014, city: "Daegu" },
    GridTarget { name: "OWM Ulsan(35.5384,129.3114)", lat: 35.5384, lon: 129.3114, city: "Ulsan" },
    GridTarget { name: "OWM Busan(35.1796,129.0756)", lat: 35.1796, lon: 129.0756, city: "Busan" },
    GridTarget { name: "OWM Pohang(36.0190,129.3435)", lat: 36.0190, lon: 129.3435, city: "Pohang" },
    GridTarget { name: "OWM Gyeongju(35.8562,129.2247)", lat: 35.8562, lon: 129.2247, city: "Gyeongju" },
    GridTarget { name: "OWM Jeju(33.4996,126.5312)", lat: 33.4996, lon: 126.5312, city: "Jeju" },
];

pub fn source() -> SourceRecord {
    SourceRecord::new(
        "owm",
        "OpenWeatherMap Air Pollution",
        "https://openweathermap.org/api/air-pollution",
        SourceKind::Model,
    )
}

pub fn query_params(target: &GridTarget, api_key: &str) -> Vec<(&'static str, String)> {
    vec![
        ("lat", target.lat.to_string()),
        ("lon", target.lon.to_string()),
        ("appid", api_key.to_string()),
    ]
}

fn station_for(target: &GridTarget) -> StationRecord {
    StationRecord {
        external_code: format!("OWM_{}_{}", target.lat, target.lon),
        name: target.name.to_string(),
        provider: PROVIDER.to_string(),
        kind: StationKind::GridPoint,
        city: Some(target.city.to_string()),
        country: Some("KR".to_string()),
        lat: Some(target.lat),
        lon: Some(target.lon),
        grid_res_km: Some(GRID_RES_KM),
    }
}

fn entries(payload: &Value) -> impl Iterator<Item = &Value> {
    payload
        .get("list")
        .and_then(Value::as_array)
        .map(|a| a.iter())
        .unwrap_or_default()
}

/// Convert a target's current + forecast payloads into ingest rows.
///
/// Entries without an epoch timestamp are skipped and counted.
pub fn normalize(target: &GridTarget, current: &Value, forecast: &Value) -> (Vec<IngestRow>, u64) {
    let station = station_for(target);
    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for entry in entries(current).chain(entries(forecast)) {
        let Some(epoch) = entry.get("dt").and_then(Value::as_i64) else {
            skipped += 1;
            continue;
        };
        let chrono::LocalResult::Single(ts) = Utc.timestamp_opt(epoch, 0) else {
            skipped += 1;
            continue;
        };

        let components = entry.get("components").cloned().unwrap_or(Value::Null);
        rows.push(IngestRow {
            station: station.clone(),
            measurement: MeasurementRecord {
                ts,
                pm10: components.get("pm10").and_then(Value::as_f64),
                pm25: components.get("pm2_5").and_then(Value::as_f64),
                pm10_grade: None,
                pm25_grade: None,
                unit_pm10: Some("µg/m³".to_string()),
                unit_pm25: Some("µg/m³".to_string()),
                quality: SourceQuality::Model,
                aqi_provider: Some("OWM".to_string()),
                raw: entry.clone(),
            },
        });
    }

    (rows, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn target() -> GridTarget {
        TARGETS[0]
    }

    #[test]
    fn current_and_forecast_entries_are_chained() {
        let current = json!({"list": [
            {"dt": 1736899200, "components": {"pm10": 30.0, "pm2_5": 12.0}}
        ]});
        let forecast = json!({"list": [
            {"dt": 1736902800, "components": {"pm10": 32.0, "pm2_5": 13.0}},
            {"dt": 1736906400, "components": {"pm10": 35.0}}
        ]});

        let (rows, skipped) = normalize(&target(), &current, &forecast);
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].measurement.pm10, Some(30.0));
        assert_eq!(rows[2].measurement.pm25, None);
        assert!(rows.iter().all(|r| r.measurement.quality == SourceQuality::Model));
    }

    #[test]
    fn grid_station_identity_is_coordinate_derived() {
        let current = json!({"list": [{"dt": 1736899200, "components": {}}]});
        let (rows, _) = normalize(&target(), &current, &json!({"list": []}));
        let station = &rows[0].station;
        assert_eq!(station.external_code, "OWM_37.5665_126.978");
        assert_eq!(station.kind, StationKind::GridPoint);
        assert_eq!(station.grid_res_km, Some(5.0));
    }

    #[test]
    fn entries_without_epoch_are_skipped() {
        let current = json!({"list": [{"components": {"pm10": 30.0}}]});
        let (rows, skipped) = normalize(&target(), &current, &json!({}));
        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn missing_list_yields_no_rows() {
        let (rows, skipped) = normalize(&target(), &json!({}), &json!({}));
        assert!(rows.is_empty());
        assert_eq!(skipped, 0);
    }
}
