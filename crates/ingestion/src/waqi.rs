//! WAQI city feed normalizer.
//!
//! One JSON payload per city. Timestamp preference: epoch `v`, then
//! ISO `iso`, then `s` + `tz`, falling back to the ingestion instant
//! when the feed carries none.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use aq_common::{AirError, AirResult, SourceKind, SourceQuality, StationKind};
use storage::{IngestRow, MeasurementRecord, SourceRecord, StationRecord};

pub const PROVIDER: &str = "WAQI";

/// Cities polled each run (original deployment's KR coverage).
pub const CITIES: &[&str] = &[
    "seoul",
    "incheon",
    "suwon",
    "anyang",
    "uijeongbu",
    "chuncheon",
    "gangneung",
    "daejeon",
    "cheongju",
    "jeonju",
    "gwangju",
    "daegu",
    "ulsan",
    "busan",
    "pohang",
    "gyeongju",
    "jeju",
];

pub fn source() -> SourceRecord {
    SourceRecord::new("waqi", "WAQI", "https://waqi.info", SourceKind::Observed)
}

pub fn feed_url(city: &str, token: &str) -> String {
    format!("https://api.waqi.info/feed/{}/?token={}", city, token)
}

fn parse_time(time: &Value, now: DateTime<Utc>) -> DateTime<Utc> {
    if let Some(v) = time.get("v").and_then(Value::as_i64) {
        if let chrono::LocalResult::Single(ts) = Utc.timestamp_opt(v, 0) {
            return ts;
        }
    }
    if let Some(iso) = time.get("iso").and_then(Value::as_str) {
        if let Ok(ts) = DateTime::parse_from_rfc3339(iso) {
            return ts.with_timezone(&Utc);
        }
    }
    if let (Some(s), Some(tz)) = (
        time.get("s").and_then(Value::as_str),
        time.get("tz").and_then(Value::as_str),
    ) {
        let assembled = format!("{}{}", s.replace(' ', "T"), tz);
        if let Ok(ts) = DateTime::parse_from_rfc3339(&assembled) {
            return ts.with_timezone(&Utc);
        }
    }
    now
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Convert one city feed payload into an ingest row.
pub fn normalize(city: &str, payload: &Value, now: DateTime<Utc>) -> AirResult<IngestRow> {
    if payload.get("status").and_then(Value::as_str) != Some("ok") {
        return Err(AirError::EmptyUpstream { provider: "waqi" });
    }
    let data = payload
        .get("data")
        .ok_or(AirError::EmptyUpstream { provider: "waqi" })?;

    let iaqi = data.get("iaqi").cloned().unwrap_or(Value::Null);
    let pm10 = iaqi.pointer("/pm10/v").and_then(Value::as_f64);
    let pm25 = iaqi.pointer("/pm25/v").and_then(Value::as_f64);
    let ts = parse_time(data.get("time").unwrap_or(&Value::Null), now);

    let upper = city.to_uppercase();
    Ok(IngestRow {
        station: StationRecord {
            external_code: format!("WAQI_{}", upper),
            name: format!("WAQI {}", upper),
            provider: PROVIDER.to_string(),
            kind: StationKind::Station,
            city: Some(title_case(city)),
            country: Some("KR".to_string()),
            lat: None,
            lon: None,
            grid_res_km: None,
        },
        measurement: MeasurementRecord {
            ts,
            pm10,
            pm25,
            pm10_grade: None,
            pm25_grade: None,
            unit_pm10: Some("ug/m3".to_string()),
            unit_pm25: Some("ug/m3".to_string()),
            quality: SourceQuality::Observed,
            aqi_provider: Some("WAQI".to_string()),
            raw: data.clone(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        "2025-01-15T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn normalizes_ok_payload() {
        let p = json!({
            "status": "ok",
            "data": {
                "iaqi": {"pm10": {"v": 38.0}, "pm25": {"v": 21.0}},
                "time": {"v": 1736899200}
            }
        });
        let row = normalize("seoul", &p, now()).unwrap();
        assert_eq!(row.station.external_code, "WAQI_SEOUL");
        assert_eq!(row.station.city.as_deref(), Some("Seoul"));
        assert_eq!(row.measurement.pm10, Some(38.0));
        assert_eq!(row.measurement.pm25, Some(21.0));
        assert_eq!(row.measurement.ts.timestamp(), 1736899200);
    }

    #[test]
    fn epoch_beats_iso() {
        let p = json!({
            "status": "ok",
            "data": {
                "time": {"v": 1736899200, "iso": "2020-01-01T00:00:00+09:00"}
            }
        });
        let row = normalize("busan", &p, now()).unwrap();
        assert_eq!(row.measurement.ts.timestamp(), 1736899200);
    }

    #[test]
    fn s_plus_tz_is_assembled() {
        let p = json!({
            "status": "ok",
            "data": {
                "time": {"s": "2025-01-15 09:00:00", "tz": "+09:00"}
            }
        });
        let row = normalize("jeju", &p, now()).unwrap();
        assert_eq!(row.measurement.ts.to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }

    #[test]
    fn missing_time_falls_back_to_now() {
        let p = json!({"status": "ok", "data": {}});
        let row = normalize("daegu", &p, now()).unwrap();
        assert_eq!(row.measurement.ts, now());
        assert_eq!(row.measurement.pm10, None);
    }

    #[test]
    fn non_ok_status_is_an_error() {
        let p = json!({"status": "error", "data": "over quota"});
        assert!(normalize("seoul", &p, now()).is_err());
    }
}
