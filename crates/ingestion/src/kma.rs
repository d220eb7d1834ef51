//! KMA free-form CSV normalizer.
//!
//! KMA exports arrive with inconsistent, mixed Korean/English column
//! headers and several timestamp formats. Columns are resolved by the
//! declarative candidate sets in `columns`; rows missing a station
//! name or a parseable timestamp are skipped and counted.

use aq_common::{AirError, AirResult, SourceKind, SourceQuality, StationKind};
use storage::{IngestRow, MeasurementRecord, SourceRecord, StationRecord};

use crate::columns::{
    row_to_json, KMA_DATETIME, KMA_PM10, KMA_PM10_GRADE, KMA_PM25, KMA_PM25_GRADE, KMA_STATION,
};
use crate::fields::{parse_concentration, parse_grade};
use crate::timestamp::{kst_to_utc, parse_with_formats, KMA_FORMATS};

pub const PROVIDER: &str = "KMA";

pub fn source() -> SourceRecord {
    SourceRecord::new(
        "kma_temp",
        "KMA CSV Export",
        "https://data.kma.go.kr",
        SourceKind::Observed,
    )
}

/// Parse a KMA CSV export into ingest rows.
pub fn normalize_csv(text: &str) -> AirResult<(Vec<IngestRow>, u64)> {
    // Strip a UTF-8 BOM some exports carry.
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|_| AirError::EmptyUpstream { provider: "kma" })?
        .clone();

    let mut rows = Vec::new();
    let mut skipped = 0u64;

    for record in reader.records() {
        let Ok(row) = record else {
            skipped += 1;
            continue;
        };

        let station_name = KMA_STATION
            .pick(&headers, &row)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let ts = KMA_DATETIME
            .pick(&headers, &row)
            .and_then(|s| parse_with_formats(s, KMA_FORMATS));

        let (Some(station_name), Some(ts)) = (station_name, ts) else {
            skipped += 1;
            continue;
        };

        rows.push(IngestRow {
            station: StationRecord {
                external_code: format!("KMA_{}", station_name),
                name: station_name,
                provider: PROVIDER.to_string(),
                kind: StationKind::Station,
                city: None,
                country: Some("KR".to_string()),
                lat: None,
                lon: None,
                grid_res_km: None,
            },
            measurement: MeasurementRecord {
                ts: kst_to_utc(ts),
                pm10: KMA_PM10.pick(&headers, &row).and_then(parse_concentration),
                pm25: KMA_PM25.pick(&headers, &row).and_then(parse_concentration),
                pm10_grade: KMA_PM10_GRADE.pick(&headers, &row).and_then(parse_grade),
                pm25_grade: KMA_PM25_GRADE.pick(&headers, &row).and_then(parse_grade),
                unit_pm10: None,
                unit_pm25: None,
                quality: SourceQuality::Observed,
                aqi_provider: None,
                raw: row_to_json(&headers, &row),
            },
        });
    }

    Ok((rows, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn korean_headers_normalize() {
        let csv = "\
측정소명,측정일시,미세먼지,초미세먼지
강남구,2025-01-15 09:00,45,21
서초구,2025/01/15 09,20㎍/m3,-
";
        let (rows, skipped) = normalize_csv(csv).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].station.external_code, "KMA_강남구");
        assert_eq!(rows[0].measurement.pm10, Some(45.0));
        // 09:00 KST == 00:00 UTC
        assert_eq!(
            rows[0].measurement.ts.to_rfc3339(),
            "2025-01-15T00:00:00+00:00"
        );

        // unit suffix stripped, sentinel absent
        assert_eq!(rows[1].measurement.pm10, Some(20.0));
        assert_eq!(rows[1].measurement.pm25, None);
    }

    #[test]
    fn english_headers_normalize() {
        let csv = "\
station_name,datetime,PM10,PM25,pm10_grade
Gangnam,2025-01-15 09:00,31,16,2
";
        let (rows, skipped) = normalize_csv(csv).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(rows[0].station.name, "Gangnam");
        assert_eq!(rows[0].measurement.pm10_grade, Some(2));
    }

    #[test]
    fn rows_with_unknown_timestamp_format_are_skipped() {
        let csv = "\
station,datetime,pm10
A,2025-01-15 09:00,10
B,15.01.2025 09h,20
C,,30
";
        let (rows, skipped) = normalize_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(skipped, 2);
    }

    #[test]
    fn rows_without_station_are_skipped() {
        let csv = "\
station,datetime,pm10
,2025-01-15 09:00,10
";
        let (rows, skipped) = normalize_csv(csv).unwrap();
        assert!(rows.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn bom_prefixed_export_parses() {
        let csv = "\u{feff}station,datetime,pm10\nA,2025-01-15 09:00,10\n";
        let (rows, _) = normalize_csv(csv).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn raw_row_is_preserved_as_object() {
        let csv = "station,datetime,pm10\nA,2025-01-15 09:00,10\n";
        let (rows, _) = normalize_csv(csv).unwrap();
        assert_eq!(rows[0].measurement.raw["pm10"], "10");
        assert_eq!(rows[0].measurement.raw["station"], "A");
    }
}
