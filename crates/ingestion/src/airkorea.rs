//! AirKorea ground-station feed normalizer.
//!
//! The real-time measurement API returns one JSON item per station
//! with stringly-typed pollutant values and a naive KST sample time.

use serde::Deserialize;
use serde_json::Value;

use aq_common::{AirError, AirResult, SourceKind, SourceQuality, StationKind};
use storage::{IngestRow, MeasurementRecord, SourceRecord, StationRecord};

use crate::fields::{parse_concentration, parse_grade};
use crate::timestamp::{kst_to_utc, parse_with_formats};

pub const PROVIDER: &str = "AirKorea";
const FEED_TS_FORMATS: &[&str] = &["%Y-%m-%d %H:%M"];

pub const FEED_URL: &str =
    "https://apis.data.go.kr/B552584/ArpltnInforInqireSvc/getMsrstnAcctoRltmMesureDnsty";

/// A configured station to poll, with its stable external code.
#[derive(Debug, Clone, Deserialize)]
pub struct StationSpec {
    pub external_code: String,
    pub name: String,
    pub city: Option<String>,
}

pub fn source() -> SourceRecord {
    SourceRecord::new(
        "airkorea",
        "AirKorea",
        "https://apis.data.go.kr/B552584",
        SourceKind::Observed,
    )
}

pub fn query_params(service_key: &str, station_name: &str) -> Vec<(&'static str, String)> {
    vec![
        ("serviceKey", service_key.to_string()),
        ("returnType", "json".to_string()),
        ("numOfRows", "1".to_string()),
        ("pageNo", "1".to_string()),
        ("stationName", station_name.to_string()),
        ("dataTerm", "DAILY".to_string()),
        ("ver", "1.3".to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct FeedItem {
    #[serde(rename = "pm10Value")]
    pm10_value: Option<String>,
    #[serde(rename = "pm25Value")]
    pm25_value: Option<String>,
    #[serde(rename = "pm10Grade")]
    pm10_grade: Option<String>,
    #[serde(rename = "pm25Grade")]
    pm25_grade: Option<String>,
    #[serde(rename = "dataTime")]
    data_time: Option<String>,
}

/// Convert one station's feed payload into ingest rows.
///
/// Returns the normalized rows plus the count of skipped items. A
/// payload without the expected top-level structure is an error; a
/// malformed item is a skip.
pub fn normalize(spec: &StationSpec, payload: &Value) -> AirResult<(Vec<IngestRow>, u64)> {
    let items = payload
        .pointer("/response/body/items")
        .and_then(Value::as_array)
        .ok_or(AirError::EmptyUpstream {
            provider: "airkorea",
        })?;

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for item in items {
        let parsed: FeedItem = match serde_json::from_value(item.clone()) {
            Ok(p) => p,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let ts = parsed
            .data_time
            .as_deref()
            .and_then(|s| parse_with_formats(s, FEED_TS_FORMATS));
        let Some(ts) = ts else {
            skipped += 1;
            continue;
        };

        rows.push(IngestRow {
            station: StationRecord {
                external_code: spec.external_code.clone(),
                name: spec.name.clone(),
                provider: PROVIDER.to_string(),
                kind: StationKind::Station,
                city: spec.city.clone(),
                country: Some("KR".to_string()),
                lat: None,
                lon: None,
                grid_res_km: None,
            },
            measurement: MeasurementRecord {
                ts: kst_to_utc(ts),
                pm10: parsed.pm10_value.as_deref().and_then(parse_concentration),
                pm25: parsed.pm25_value.as_deref().and_then(parse_concentration),
                pm10_grade: parsed.pm10_grade.as_deref().and_then(parse_grade),
                pm25_grade: parsed.pm25_grade.as_deref().and_then(parse_grade),
                unit_pm10: Some("µg/m³".to_string()),
                unit_pm25: Some("µg/m³".to_string()),
                quality: SourceQuality::Observed,
                aqi_provider: None,
                raw: item.clone(),
            },
        });
    }

    Ok((rows, skipped))
}
