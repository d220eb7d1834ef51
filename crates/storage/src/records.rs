//! Canonical record types persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use aq_common::{SourceKind, SourceQuality, StationKind};

/// A provider identity. `code` is the natural key; upserts are
/// idempotent and refresh the display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub code: String,
    pub name: String,
    pub base_url: String,
    pub kind: SourceKind,
}

impl SourceRecord {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
        kind: SourceKind,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            base_url: base_url.into(),
            kind,
        }
    }
}

/// A physical or synthetic sampling point, unique per
/// (provider, external_code). Coordinates are immutable once the row
/// exists; re-ingestion may only refresh metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationRecord {
    pub external_code: String,
    pub name: String,
    pub provider: String,
    pub kind: StationKind,
    pub city: Option<String>,
    pub country: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub grid_res_km: Option<f64>,
}

/// One reading for one station at one provider-reported timestamp,
/// unique per (station, ts). The raw provider payload is preserved
/// verbatim for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementRecord {
    pub ts: DateTime<Utc>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10_grade: Option<i16>,
    pub pm25_grade: Option<i16>,
    pub unit_pm10: Option<String>,
    pub unit_pm25: Option<String>,
    pub quality: SourceQuality,
    pub aqi_provider: Option<String>,
    pub raw: serde_json::Value,
}

/// A satellite hotspot detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FireRecord {
    pub detected_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub satellite: String,
    pub confidence: Option<String>,
    pub frp: Option<f64>,
    pub raw: serde_json::Value,
}

/// One normalized (station, measurement) pair produced by a
/// provider normalizer.
#[derive(Debug, Clone)]
pub struct IngestRow {
    pub station: StationRecord,
    pub measurement: MeasurementRecord,
}

/// The output of one normalizer run, committed as a single batch.
#[derive(Debug, Clone)]
pub struct IngestBatch {
    pub source: SourceRecord,
    pub rows: Vec<IngestRow>,
    /// Malformed rows skipped during normalization.
    pub skipped: u64,
}

impl IngestBatch {
    pub fn new(source: SourceRecord) -> Self {
        Self {
            source,
            rows: Vec::new(),
            skipped: 0,
        }
    }
}

/// Summary counts for an applied ingestion batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestCounts {
    pub inserted: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// The nearest station carrying a latest reading, as returned by a
/// proximity query.
#[derive(Debug, Clone, Serialize)]
pub struct NearestReading {
    pub station_id: i64,
    pub name: String,
    pub provider: String,
    pub kind: StationKind,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub distance_m: f64,
    pub ts: DateTime<Utc>,
    pub pm10: Option<f64>,
    pub pm25: Option<f64>,
    pub unit_pm10: Option<String>,
    pub unit_pm25: Option<String>,
}
