//! In-memory store implementing the same contract as the Postgres
//! store: the three unique keys, per-quality conflict policy,
//! immutable station coordinates and best-effort fire dedup.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use aq_common::AirResult;
use storage::{
    AirStore, ConflictPolicy, FireRecord, IngestBatch, IngestCounts, MeasurementRecord,
    NearestReading, SourceRecord, StationRecord,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    /// code -> id
    sources: HashMap<String, i64>,
    /// (provider, external_code) -> (id, record)
    stations: HashMap<(String, String), (i64, StationRecord)>,
    /// (station_id, ts) -> record
    measurements: HashMap<(i64, DateTime<Utc>), MeasurementRecord>,
    /// (source_code, record), deduped on (source, ts, lat, lon)
    fires: Vec<(String, FireRecord)>,
}

/// In-memory implementation of [`AirStore`].
#[derive(Default)]
pub struct MemStore {
    inner: Mutex<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn measurement_count(&self) -> usize {
        self.inner.lock().unwrap().measurements.len()
    }

    pub fn station_count(&self) -> usize {
        self.inner.lock().unwrap().stations.len()
    }

    pub fn fire_count(&self) -> usize {
        self.inner.lock().unwrap().fires.len()
    }

    /// Look up a measurement by station identity and timestamp.
    pub fn measurement(
        &self,
        provider: &str,
        external_code: &str,
        ts: DateTime<Utc>,
    ) -> Option<MeasurementRecord> {
        let inner = self.inner.lock().unwrap();
        let (station_id, _) = inner
            .stations
            .get(&(provider.to_string(), external_code.to_string()))?;
        inner.measurements.get(&(*station_id, ts)).cloned()
    }

    /// Stored coordinates for a station.
    pub fn station_coords(&self, provider: &str, external_code: &str) -> Option<(f64, f64)> {
        let inner = self.inner.lock().unwrap();
        let (_, station) = inner
            .stations
            .get(&(provider.to_string(), external_code.to_string()))?;
        Some((station.lat?, station.lon?))
    }
}

fn haversine_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians() / 2.0;
    let dlon = (lon2 - lon1).to_radians() / 2.0;
    let a = dlat.sin().powi(2) + lat1.to_radians().cos() * lat2.to_radians().cos() * dlon.sin().powi(2);
    2.0 * 6_371_000.0 * a.sqrt().asin()
}

#[async_trait]
impl AirStore for MemStore {
    async fn ensure_source(&self, source: &SourceRecord) -> AirResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(id) = inner.sources.get(&source.code) {
            return Ok(*id);
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.sources.insert(source.code.clone(), id);
        Ok(id)
    }

    async fn apply_batch(&self, batch: &IngestBatch) -> AirResult<IngestCounts> {
        let mut inner = self.inner.lock().unwrap();

        if !inner.sources.contains_key(&batch.source.code) {
            inner.next_id += 1;
            let id = inner.next_id;
            inner.sources.insert(batch.source.code.clone(), id);
        }

        let mut counts = IngestCounts {
            skipped: batch.skipped,
            ..Default::default()
        };

        for row in &batch.rows {
            let key = (
                row.station.provider.clone(),
                row.station.external_code.clone(),
            );
            let station_id = match inner.stations.get_mut(&key) {
                Some((id, existing)) => {
                    // Metadata refresh only; coordinates are immutable.
                    existing.name = row.station.name.clone();
                    if row.station.city.is_some() {
                        existing.city = row.station.city.clone();
                    }
                    if row.station.country.is_some() {
                        existing.country = row.station.country.clone();
                    }
                    *id
                }
                None => {
                    inner.next_id += 1;
                    let id = inner.next_id;
                    inner.stations.insert(key, (id, row.station.clone()));
                    id
                }
            };

            let m = &row.measurement;
            let mkey = (station_id, m.ts);
            match inner.measurements.get_mut(&mkey) {
                Some(existing) => {
                    let policy = ConflictPolicy::for_quality(m.quality);
                    existing.pm10 = policy.merge(m.pm10, existing.pm10);
                    existing.pm25 = policy.merge(m.pm25, existing.pm25);
                    if policy == ConflictPolicy::Overwrite {
                        existing.pm10_grade = m.pm10_grade;
                        existing.pm25_grade = m.pm25_grade;
                    }
                    if policy == ConflictPolicy::Overwrite || !m.raw.is_null() {
                        existing.raw = m.raw.clone();
                    }
                    counts.updated += 1;
                }
                None => {
                    inner.measurements.insert(mkey, m.clone());
                    counts.inserted += 1;
                }
            }
        }

        Ok(counts)
    }

    async fn insert_fires(&self, source_code: &str, fires: &[FireRecord]) -> AirResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let mut inserted = 0u64;
        for fire in fires {
            let duplicate = inner.fires.iter().any(|(code, f)| {
                code == source_code
                    && f.detected_at == fire.detected_at
                    && f.lat == fire.lat
                    && f.lon == fire.lon
            });
            if !duplicate {
                inner.fires.push((source_code.to_string(), fire.clone()));
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn sweep_fires(&self, source_code: &str, cutoff: DateTime<Utc>) -> AirResult<u64> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.fires.len();
        inner
            .fires
            .retain(|(code, f)| !(code == source_code && f.detected_at < cutoff));
        Ok((before - inner.fires.len()) as u64)
    }

    async fn nearest_reading(&self, lat: f64, lon: f64) -> AirResult<Option<NearestReading>> {
        let inner = self.inner.lock().unwrap();

        let mut best: Option<NearestReading> = None;
        for (id, station) in inner.stations.values() {
            let (Some(s_lat), Some(s_lon)) = (station.lat, station.lon) else {
                continue;
            };
            let latest = inner
                .measurements
                .iter()
                .filter(|((sid, _), _)| sid == id)
                .max_by_key(|((_, ts), _)| *ts);
            let Some((_, m)) = latest else { continue };

            let distance_m = haversine_m(lat, lon, s_lat, s_lon);
            if best.as_ref().map_or(true, |b| distance_m < b.distance_m) {
                best = Some(NearestReading {
                    station_id: *id,
                    name: station.name.clone(),
                    provider: station.provider.clone(),
                    kind: station.kind,
                    lat: station.lat,
                    lon: station.lon,
                    distance_m,
                    ts: m.ts,
                    pm10: m.pm10,
                    pm25: m.pm25,
                    unit_pm10: m.unit_pm10.clone(),
                    unit_pm25: m.unit_pm25.clone(),
                });
            }
        }

        Ok(best)
    }
}
