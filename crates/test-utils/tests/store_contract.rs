//! Store contract exercised against the in-memory double.

use chrono::{Duration, TimeZone, Utc};
use serde_json::json;

use aq_common::{SourceKind, SourceQuality, StationKind};
use storage::{
    AirStore, FireRecord, IngestBatch, IngestCounts, IngestRow, MeasurementRecord, SourceRecord,
    StationRecord,
};
use test_utils::MemStore;

fn source(quality_hint: &str) -> SourceRecord {
    SourceRecord::new(
        format!("src_{quality_hint}"),
        "Test Source",
        "https://example.test",
        SourceKind::Observed,
    )
}

fn station(external_code: &str, lat: f64, lon: f64) -> StationRecord {
    StationRecord {
        external_code: external_code.to_string(),
        name: external_code.to_string(),
        provider: "TEST".to_string(),
        kind: StationKind::Station,
        city: Some("Seoul".to_string()),
        country: Some("KR".to_string()),
        lat: Some(lat),
        lon: Some(lon),
        grid_res_km: None,
    }
}

fn measurement(quality: SourceQuality, pm10: Option<f64>, pm25: Option<f64>) -> MeasurementRecord {
    MeasurementRecord {
        ts: Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap(),
        pm10,
        pm25,
        pm10_grade: None,
        pm25_grade: None,
        unit_pm10: Some("ug/m3".to_string()),
        unit_pm25: Some("ug/m3".to_string()),
        quality,
        aqi_provider: None,
        raw: json!({"pm10": pm10, "pm25": pm25}),
    }
}

fn batch(source: SourceRecord, rows: Vec<IngestRow>) -> IngestBatch {
    IngestBatch {
        source,
        rows,
        skipped: 0,
    }
}

#[tokio::test]
async fn reingest_is_idempotent() {
    let store = MemStore::new();
    let b = batch(
        source("obs"),
        vec![IngestRow {
            station: station("S1", 37.5, 127.0),
            measurement: measurement(SourceQuality::Observed, Some(30.0), Some(12.0)),
        }],
    );

    let first = store.apply_batch(&b).await.unwrap();
    assert_eq!(
        first,
        IngestCounts {
            inserted: 1,
            updated: 0,
            skipped: 0
        }
    );

    let second = store.apply_batch(&b).await.unwrap();
    assert_eq!(second.inserted, 0);
    assert_eq!(second.updated, 1);
    assert_eq!(store.measurement_count(), 1);
    assert_eq!(store.station_count(), 1);
}

#[tokio::test]
async fn aggregate_merge_fills_gaps_without_wiping() {
    let store = MemStore::new();
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();

    // First record carries pm10 only, the second pm25 only.
    let mut first = measurement(SourceQuality::Aggregate, Some(40.0), None);
    first.ts = ts;
    store
        .apply_batch(&batch(
            source("agg"),
            vec![IngestRow {
                station: station("S1", 37.5, 127.0),
                measurement: first,
            }],
        ))
        .await
        .unwrap();

    let mut second = measurement(SourceQuality::Aggregate, None, Some(20.0));
    second.ts = ts;
    store
        .apply_batch(&batch(
            source("agg"),
            vec![IngestRow {
                station: station("S1", 37.5, 127.0),
                measurement: second,
            }],
        ))
        .await
        .unwrap();

    let merged = store.measurement("TEST", "S1", ts).unwrap();
    assert_eq!(merged.pm10, Some(40.0));
    assert_eq!(merged.pm25, Some(20.0));
}

#[tokio::test]
async fn aggregate_merge_prefers_incoming_non_null() {
    let store = MemStore::new();
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();

    for pm10 in [Some(40.0), Some(55.0)] {
        let mut m = measurement(SourceQuality::Aggregate, pm10, None);
        m.ts = ts;
        store
            .apply_batch(&batch(
                source("agg"),
                vec![IngestRow {
                    station: station("S1", 37.5, 127.0),
                    measurement: m,
                }],
            ))
            .await
            .unwrap();
    }

    assert_eq!(store.measurement("TEST", "S1", ts).unwrap().pm10, Some(55.0));
}

#[tokio::test]
async fn observed_overwrites_nulls_included() {
    let store = MemStore::new();
    let ts = Utc.with_ymd_and_hms(2026, 3, 1, 6, 0, 0).unwrap();

    let mut first = measurement(SourceQuality::Observed, Some(30.0), Some(12.0));
    first.ts = ts;
    let mut second = measurement(SourceQuality::Observed, Some(35.0), None);
    second.ts = ts;

    for m in [first, second] {
        store
            .apply_batch(&batch(
                source("obs"),
                vec![IngestRow {
                    station: station("S1", 37.5, 127.0),
                    measurement: m,
                }],
            ))
            .await
            .unwrap();
    }

    let row = store.measurement("TEST", "S1", ts).unwrap();
    assert_eq!(row.pm10, Some(35.0));
    assert_eq!(row.pm25, None);
}

#[tokio::test]
async fn station_coordinates_are_immutable() {
    let store = MemStore::new();

    store
        .apply_batch(&batch(
            source("obs"),
            vec![IngestRow {
                station: station("S1", 37.5, 127.0),
                measurement: measurement(SourceQuality::Observed, Some(30.0), None),
            }],
        ))
        .await
        .unwrap();

    // Re-ingest with drifted coordinates; the stored pair must not move.
    let mut drifted = station("S1", 37.6, 127.1);
    drifted.name = "Renamed".to_string();
    let mut later = measurement(SourceQuality::Observed, Some(31.0), None);
    later.ts = later.ts + Duration::hours(1);
    store
        .apply_batch(&batch(
            source("obs"),
            vec![IngestRow {
                station: drifted,
                measurement: later,
            }],
        ))
        .await
        .unwrap();

    assert_eq!(store.station_coords("TEST", "S1"), Some((37.5, 127.0)));
    assert_eq!(store.station_count(), 1);
}

#[tokio::test]
async fn fire_dedup_and_retention_boundary() {
    let store = MemStore::new();
    let now = Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap();

    let fire = |days_ago: i64, lat: f64| FireRecord {
        detected_at: now - Duration::days(days_ago),
        lat,
        lon: 127.0,
        satellite: "N".to_string(),
        confidence: Some("n".to_string()),
        frp: Some(4.2),
        raw: json!({}),
    };

    let inserted = store
        .insert_fires(
            "nasa_firms",
            &[fire(10, 37.0), fire(10, 37.0), fire(16, 37.5)],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let cutoff = now - Duration::days(15);
    let deleted = store.sweep_fires("nasa_firms", cutoff).await.unwrap();
    assert_eq!(deleted, 1);
    assert_eq!(store.fire_count(), 1);
}

#[tokio::test]
async fn nearest_orders_by_distance() {
    let store = MemStore::new();

    for (code, lat, lon) in [("NEAR", 37.50, 127.00), ("FAR", 37.90, 127.40)] {
        store
            .apply_batch(&batch(
                source("obs"),
                vec![IngestRow {
                    station: station(code, lat, lon),
                    measurement: measurement(SourceQuality::Observed, Some(30.0), Some(12.0)),
                }],
            ))
            .await
            .unwrap();
    }

    let hit = store.nearest_reading(37.51, 127.01).await.unwrap().unwrap();
    assert_eq!(hit.name, "NEAR");
    assert!(hit.distance_m > 0.0 && hit.distance_m < 5_000.0);
}

#[tokio::test]
async fn nearest_is_none_when_empty() {
    let store = MemStore::new();
    assert!(store.nearest_reading(37.5, 127.0).await.unwrap().is_none());
}
