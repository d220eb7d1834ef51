//! Store capability consumed by ingestion and the resolution service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use aq_common::AirResult;

use crate::records::{FireRecord, IngestBatch, IngestCounts, NearestReading, SourceRecord};

/// Persist and query the canonical schema.
///
/// Implementations must preserve the three unique keys the upsert
/// behavior depends on: sources.code, stations (provider,
/// external_code) and measurements (station_id, ts).
#[async_trait]
pub trait AirStore: Send + Sync {
    /// Idempotently upsert a provider identity, returning its id.
    async fn ensure_source(&self, source: &SourceRecord) -> AirResult<i64>;

    /// Apply one normalizer batch atomically. No partial commits: a
    /// failure leaves previously committed data untouched.
    async fn apply_batch(&self, batch: &IngestBatch) -> AirResult<IngestCounts>;

    /// Insert fire detections for a source, best-effort deduplicated
    /// on (source, detected_at, lat, lon). Returns rows inserted.
    async fn insert_fires(&self, source_code: &str, fires: &[FireRecord]) -> AirResult<u64>;

    /// Delete fire rows for a source detected before the cutoff.
    /// Returns rows deleted.
    async fn sweep_fires(&self, source_code: &str, cutoff: DateTime<Utc>) -> AirResult<u64>;

    /// The single station nearest to (lat, lon) that has a latest
    /// reading, ordered by ascending great-circle distance.
    async fn nearest_reading(&self, lat: f64, lon: f64) -> AirResult<Option<NearestReading>>;
}
