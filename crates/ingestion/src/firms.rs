//! NASA FIRMS satellite hotspot CSV normalizer.
//!
//! Prefers the keyed area API feed; when that feed fails or its
//! schema does not carry the detection date/time columns, falls back
//! to the public 24h global CSV.

use aq_common::{AirError, AirResult, SourceKind};
use storage::{FireRecord, SourceRecord};

use crate::columns::{row_to_json, FieldCandidates, FIRMS_DATE, FIRMS_TIME};
use crate::fetch::ProviderClient;
use crate::timestamp::{parse_with_formats, utc_naive, FIRMS_FORMATS};

pub const SOURCE_CODE: &str = "nasa_firms";
/// Detection rows older than this are purged by the retention sweep.
pub const RETENTION_DAYS: i64 = 15;

/// Query bbox (lon_min, lat_min, lon_max, lat_max) around the
/// deployment's coverage area.
pub const BBOX: (f64, f64, f64, f64) = (126.3, 36.9, 127.8, 38.2);
pub const SENSOR: &str = "VIIRS_SNPP";

pub const PUBLIC_URL: &str =
    "https://firms.modaps.eosdis.nasa.gov/data/active_fire/suomi-npp-viirs-c2/csv/SUOMI_VIIRS_C2_Global_24h.csv";

const LAT: FieldCandidates = FieldCandidates {
    field: "latitude",
    names: &["latitude"],
};
const LON: FieldCandidates = FieldCandidates {
    field: "longitude",
    names: &["longitude"],
};
const SATELLITE: FieldCandidates = FieldCandidates {
    field: "satellite",
    names: &["satellite"],
};
const CONFIDENCE: FieldCandidates = FieldCandidates {
    field: "confidence",
    names: &["confidence", "confidence_text"],
};
const FRP: FieldCandidates = FieldCandidates {
    field: "frp",
    names: &["frp"],
};

pub fn source() -> SourceRecord {
    SourceRecord::new(
        SOURCE_CODE,
        "NASA FIRMS",
        "https://firms.modaps.eosdis.nasa.gov",
        SourceKind::Satellite,
    )
}

pub fn area_url(map_key: &str) -> String {
    format!(
        "https://firms.modaps.eosdis.nasa.gov/api/area/csv/{}/{}/1/{},{},{},{}",
        map_key, SENSOR, BBOX.0, BBOX.1, BBOX.2, BBOX.3
    )
}

/// Normalized output of one detection feed.
#[derive(Debug, Default)]
pub struct FireBatch {
    pub fires: Vec<FireRecord>,
    pub skipped: u64,
}

/// Parse a detection CSV into fire records.
///
/// Missing detection date/time columns make the whole payload
/// unusable (error, so the caller can fall back); individual rows
/// with unparseable fields are skipped and counted.
pub fn normalize_csv(text: &str) -> AirResult<FireBatch> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| AirError::EmptyUpstream { provider: "firms" })?
        .clone();

    if FIRMS_DATE.match_header(&headers).is_none() || FIRMS_TIME.match_header(&headers).is_none() {
        return Err(AirError::EmptyUpstream { provider: "firms" });
    }

    let mut batch = FireBatch::default();

    for record in reader.records() {
        let Ok(row) = record else {
            batch.skipped += 1;
            continue;
        };

        let (Some(date), Some(time)) = (
            FIRMS_DATE.pick(&headers, &row),
            FIRMS_TIME.pick(&headers, &row),
        ) else {
            batch.skipped += 1;
            continue;
        };

        let when = format!("{} {}", date, time);
        let Some(ts) = parse_with_formats(&when, FIRMS_FORMATS) else {
            batch.skipped += 1;
            continue;
        };

        let lat = LAT.pick(&headers, &row).and_then(|s| s.parse::<f64>().ok());
        let lon = LON.pick(&headers, &row).and_then(|s| s.parse::<f64>().ok());
        let (Some(lat), Some(lon)) = (lat, lon) else {
            batch.skipped += 1;
            continue;
        };

        let satellite = SATELLITE
            .pick(&headers, &row)
            .filter(|s| !s.is_empty())
            .unwrap_or("VIIRS")
            .to_string();
        let confidence = CONFIDENCE
            .pick(&headers, &row)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let frp = FRP
            .pick(&headers, &row)
            .filter(|s| !s.is_empty() && *s != "NA")
            .and_then(|s| s.parse::<f64>().ok());

        batch.fires.push(FireRecord {
            detected_at: utc_naive(ts),
            lat,
            lon,
            satellite,
            confidence,
            frp,
            raw: row_to_json(&headers, &row),
        });
    }

    Ok(batch)
}

/// Fetch and normalize the detection feed: area API first, public
/// CSV when the area feed fails or carries the wrong schema.
pub async fn fetch_and_normalize(client: &ProviderClient, map_key: &str) -> AirResult<FireBatch> {
    match client.get_text("firms", &area_url(map_key), &[]).await {
        Ok(text) => match normalize_csv(&text) {
            Ok(batch) => return Ok(batch),
            Err(e) => {
                tracing::warn!(error = %e, "Area feed unusable, falling back to public CSV");
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "Area feed fetch failed, falling back to public CSV");
        }
    }

    let text = client.get_text("firms", PUBLIC_URL, &[]).await?;
    normalize_csv(&text)
}
