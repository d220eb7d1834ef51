//! OpenAQ aggregate feed normalizer.
//!
//! OpenAQ rows carry exactly one pollutant per record, so the
//! resulting measurements merge null-safely at the store (aggregate
//! quality: a record's missing pollutant must not clobber a value a
//! previous record populated for the same hour).

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use aq_common::{AirError, AirResult, SourceKind, SourceQuality, StationKind};
use storage::{IngestRow, MeasurementRecord, SourceRecord, StationRecord};

pub const PROVIDER: &str = "OPENAQ";
pub const FEED_URL: &str = "https://api.openaq.org/v3/measurements";

pub fn source() -> SourceRecord {
    SourceRecord::new("openaq", "OpenAQ", "https://openaq.org", SourceKind::Aggregate)
}

pub fn query_params() -> Vec<(&'static str, String)> {
    vec![
        ("country", "KR".to_string()),
        ("parameter", "pm25,pm10".to_string()),
        ("limit", "100".to_string()),
        ("order_by", "datetime".to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct FeedResult {
    location: Option<String>,
    city: Option<String>,
    coordinates: Option<Coordinates>,
    date: FeedDate,
    value: f64,
    parameter: String,
}

#[derive(Debug, Deserialize)]
struct Coordinates {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedDate {
    utc: String,
}

/// Convert a measurements page into ingest rows.
pub fn normalize(payload: &Value) -> AirResult<(Vec<IngestRow>, u64)> {
    let results = payload
        .get("results")
        .and_then(Value::as_array)
        .ok_or(AirError::EmptyUpstream { provider: "openaq" })?;

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for result in results {
        let parsed: FeedResult = match serde_json::from_value(result.clone()) {
            Ok(p) => p,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let ts = match DateTime::parse_from_rfc3339(&parsed.date.utc) {
            Ok(t) => t.with_timezone(&Utc),
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let (pm10, pm25) = match parsed.parameter.as_str() {
            "pm10" => (Some(parsed.value), None),
            "pm25" | "pm2.5" => (None, Some(parsed.value)),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let location = parsed.location.unwrap_or_else(|| "unknown".to_string());
        let (lat, lon) = parsed
            .coordinates
            .map(|c| (c.latitude, c.longitude))
            .unwrap_or((None, None));

        rows.push(IngestRow {
            station: StationRecord {
                external_code: format!("OPENAQ_{}", location),
                name: location,
                provider: PROVIDER.to_string(),
                kind: StationKind::Station,
                city: parsed.city.or_else(|| Some("KR".to_string())),
                country: Some("KR".to_string()),
                lat,
                lon,
                grid_res_km: None,
            },
            measurement: MeasurementRecord {
                ts,
                pm10,
                pm25,
                pm10_grade: None,
                pm25_grade: None,
                unit_pm10: Some("µg/m³".to_string()),
                unit_pm25: Some("µg/m³".to_string()),
                quality: SourceQuality::Aggregate,
                aqi_provider: Some("OpenAQ".to_string()),
                raw: result.clone(),
            },
        });
    }

    Ok((rows, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(results: Value) -> Value {
        json!({"results": results})
    }

    #[test]
    fn one_pollutant_per_record() {
        let p = payload(json!([
            {
                "location": "Seoul-1",
                "city": "Seoul",
                "coordinates": {"latitude": 37.55, "longitude": 126.99},
                "date": {"utc": "2025-01-15T00:00:00Z"},
                "value": 41.0,
                "parameter": "pm10"
            },
            {
                "location": "Seoul-1",
                "date": {"utc": "2025-01-15T00:00:00Z"},
                "value": 19.0,
                "parameter": "pm25"
            }
        ]));

        let (rows, skipped) = normalize(&p).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].measurement.pm10, Some(41.0));
        assert_eq!(rows[0].measurement.pm25, None);
        assert_eq!(rows[1].measurement.pm10, None);
        assert_eq!(rows[1].measurement.pm25, Some(19.0));
        assert_eq!(rows[0].station.external_code, "OPENAQ_Seoul-1");
        assert_eq!(rows[0].measurement.quality, SourceQuality::Aggregate);
    }

    #[test]
    fn unknown_parameter_is_skipped() {
        let p = payload(json!([{
            "location": "Seoul-1",
            "date": {"utc": "2025-01-15T00:00:00Z"},
            "value": 0.4,
            "parameter": "co"
        }]));
        let (rows, skipped) = normalize(&p).unwrap();
        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn bad_timestamp_is_skipped() {
        let p = payload(json!([{
            "location": "Seoul-1",
            "date": {"utc": "yesterday-ish"},
            "value": 10.0,
            "parameter": "pm10"
        }]));
        let (rows, skipped) = normalize(&p).unwrap();
        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn missing_results_is_an_error() {
        assert!(normalize(&json!({"error": "rate limited"})).is_err());
    }
}
