//! PostgreSQL-backed canonical store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::{debug, info};

use aq_common::{AirError, AirResult, StationKind};

use crate::conflict::ConflictPolicy;
use crate::records::{
    FireRecord, IngestBatch, IngestCounts, NearestReading, SourceRecord, StationRecord,
};
use crate::store::AirStore;

/// Database connection pool and canonical-store operations.
pub struct PgStore {
    pool: PgPool,
}

fn db_err(context: &str, e: sqlx::Error) -> AirError {
    AirError::Database(format!("{}: {}", context, e))
}

impl PgStore {
    /// Create a new store connection from a database URL.
    pub async fn connect(database_url: &str) -> AirResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| db_err("Connection failed", e))?;

        Ok(Self { pool })
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> AirResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| db_err("Migration failed", e))?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AirStore for PgStore {
    async fn ensure_source(&self, source: &SourceRecord) -> AirResult<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sources (code, name, base_url, kind) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE SET \
               name = EXCLUDED.name, base_url = EXCLUDED.base_url, kind = EXCLUDED.kind \
             RETURNING id",
        )
        .bind(&source.code)
        .bind(&source.name)
        .bind(&source.base_url)
        .bind(source.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_err("Source upsert failed", e))?;

        Ok(id)
    }

    async fn apply_batch(&self, batch: &IngestBatch) -> AirResult<IngestCounts> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err("Begin failed", e))?;

        let source_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO sources (code, name, base_url, kind) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (code) DO UPDATE SET \
               name = EXCLUDED.name, base_url = EXCLUDED.base_url, kind = EXCLUDED.kind \
             RETURNING id",
        )
        .bind(&batch.source.code)
        .bind(&batch.source.name)
        .bind(&batch.source.base_url)
        .bind(batch.source.kind.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| db_err("Source upsert failed", e))?;

        let mut counts = IngestCounts {
            skipped: batch.skipped,
            ..Default::default()
        };

        for row in &batch.rows {
            let station_id = upsert_station(&mut tx, &row.station, source_id).await?;

            let m = &row.measurement;
            let policy = ConflictPolicy::for_quality(m.quality);
            let sql = match policy {
                // Provider-authoritative rows replace prior values wholesale.
                ConflictPolicy::Overwrite => {
                    "INSERT INTO measurements \
                       (station_id, ts, pm10, pm25, pm10_grade, pm25_grade, \
                        unit_pm10, unit_pm25, source_quality, aqi_provider, raw, source_id) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::jsonb, $12) \
                     ON CONFLICT (station_id, ts) DO UPDATE SET \
                       pm10 = EXCLUDED.pm10, pm25 = EXCLUDED.pm25, \
                       pm10_grade = EXCLUDED.pm10_grade, pm25_grade = EXCLUDED.pm25_grade, \
                       raw = EXCLUDED.raw, source_id = EXCLUDED.source_id \
                     RETURNING (xmax = 0) AS inserted"
                }
                // Aggregate rows carry one pollutant at a time; a null must
                // never clobber a populated value.
                ConflictPolicy::Coalesce => {
                    "INSERT INTO measurements \
                       (station_id, ts, pm10, pm25, pm10_grade, pm25_grade, \
                        unit_pm10, unit_pm25, source_quality, aqi_provider, raw, source_id) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11::jsonb, $12) \
                     ON CONFLICT (station_id, ts) DO UPDATE SET \
                       pm10 = COALESCE(EXCLUDED.pm10, measurements.pm10), \
                       pm25 = COALESCE(EXCLUDED.pm25, measurements.pm25), \
                       raw = COALESCE(EXCLUDED.raw, measurements.raw) \
                     RETURNING (xmax = 0) AS inserted"
                }
            };

            let raw_json = m.raw.to_string();
            let inserted = sqlx::query_scalar::<_, bool>(sql)
                .bind(station_id)
                .bind(m.ts)
                .bind(m.pm10)
                .bind(m.pm25)
                .bind(m.pm10_grade)
                .bind(m.pm25_grade)
                .bind(&m.unit_pm10)
                .bind(&m.unit_pm25)
                .bind(m.quality.as_str())
                .bind(&m.aqi_provider)
                .bind(&raw_json)
                .bind(source_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| db_err("Measurement upsert failed", e))?;

            if inserted {
                counts.inserted += 1;
            } else {
                counts.updated += 1;
            }
        }

        tx.commit().await.map_err(|e| db_err("Commit failed", e))?;

        info!(
            source = %batch.source.code,
            inserted = counts.inserted,
            updated = counts.updated,
            skipped = counts.skipped,
            "Applied ingestion batch"
        );

        Ok(counts)
    }

    async fn insert_fires(&self, source_code: &str, fires: &[FireRecord]) -> AirResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_err("Begin failed", e))?;

        let mut inserted = 0u64;
        for fire in fires {
            let raw_json = fire.raw.to_string();
            let result = sqlx::query(
                "INSERT INTO fires \
                   (detected_at, lat, lon, satellite, confidence, frp, raw, source_code) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb, $8) \
                 ON CONFLICT (source_code, detected_at, lat, lon) DO NOTHING",
            )
            .bind(fire.detected_at)
            .bind(fire.lat)
            .bind(fire.lon)
            .bind(&fire.satellite)
            .bind(&fire.confidence)
            .bind(fire.frp)
            .bind(&raw_json)
            .bind(source_code)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_err("Fire insert failed", e))?;

            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(|e| db_err("Commit failed", e))?;

        info!(source = %source_code, inserted, total = fires.len(), "Inserted fire detections");
        Ok(inserted)
    }

    async fn sweep_fires(&self, source_code: &str, cutoff: DateTime<Utc>) -> AirResult<u64> {
        let result = sqlx::query("DELETE FROM fires WHERE source_code = $1 AND detected_at < $2")
            .bind(source_code)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| db_err("Fire sweep failed", e))?;

        let deleted = result.rows_affected();
        if deleted > 0 {
            info!(source = %source_code, deleted, cutoff = %cutoff, "Swept old fire detections");
        }
        Ok(deleted)
    }

    async fn nearest_reading(&self, lat: f64, lon: f64) -> AirResult<Option<NearestReading>> {
        debug!(lat, lon, "Proximity query");

        let row = sqlx::query_as::<_, NearestRow>(
            "SELECT s.id AS station_id, s.name, s.provider, s.kind, s.lat, s.lon, \
               m.ts, m.pm10, m.pm25, m.unit_pm10, m.unit_pm25, \
               2.0 * 6371000.0 * asin(sqrt( \
                 pow(sin(radians((s.lat - $1) / 2)), 2) \
                 + cos(radians($1)) * cos(radians(s.lat)) \
                 * pow(sin(radians((s.lon - $2) / 2)), 2))) AS distance_m \
             FROM stations s \
             JOIN LATERAL ( \
               SELECT ts, pm10, pm25, unit_pm10, unit_pm25 \
               FROM measurements WHERE station_id = s.id \
               ORDER BY ts DESC LIMIT 1 \
             ) m ON TRUE \
             WHERE s.lat IS NOT NULL AND s.lon IS NOT NULL \
             ORDER BY distance_m ASC \
             LIMIT 1",
        )
        .bind(lat)
        .bind(lon)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_err("Proximity query failed", e))?;

        Ok(row.map(|r| r.into()))
    }
}

async fn upsert_station(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    station: &StationRecord,
    source_id: i64,
) -> AirResult<i64> {
    // Coordinates and kind are immutable after first insert; only
    // display metadata is refreshed on conflict.
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO stations \
           (external_code, name, provider, kind, city, country, lat, lon, grid_res_km, source_id) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (provider, external_code) DO UPDATE SET \
           name = EXCLUDED.name, \
           city = COALESCE(EXCLUDED.city, stations.city), \
           country = COALESCE(EXCLUDED.country, stations.country) \
         RETURNING id",
    )
    .bind(&station.external_code)
    .bind(&station.name)
    .bind(&station.provider)
    .bind(station.kind.as_str())
    .bind(&station.city)
    .bind(&station.country)
    .bind(station.lat)
    .bind(station.lon)
    .bind(station.grid_res_km)
    .bind(source_id)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_err("Station upsert failed", e))?;

    Ok(id)
}

/// Internal row type for the proximity query.
#[derive(FromRow)]
struct NearestRow {
    station_id: i64,
    name: String,
    provider: String,
    kind: String,
    lat: Option<f64>,
    lon: Option<f64>,
    ts: DateTime<Utc>,
    pm10: Option<f64>,
    pm25: Option<f64>,
    unit_pm10: Option<String>,
    unit_pm25: Option<String>,
    distance_m: f64,
}

impl From<NearestRow> for NearestReading {
    fn from(row: NearestRow) -> Self {
        NearestReading {
            station_id: row.station_id,
            name: row.name,
            provider: row.provider,
            kind: StationKind::from_str_lossy(&row.kind),
            lat: row.lat,
            lon: row.lon,
            distance_m: row.distance_m,
            ts: row.ts,
            pm10: row.pm10,
            pm25: row.pm25,
            unit_pm10: row.unit_pm10,
            unit_pm25: row.unit_pm25,
        }
    }
}

/// Database schema SQL.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id BIGSERIAL PRIMARY KEY,
    code VARCHAR(50) NOT NULL UNIQUE,
    name TEXT NOT NULL,
    base_url TEXT NOT NULL,
    kind VARCHAR(20) NOT NULL DEFAULT 'observed'
);

CREATE TABLE IF NOT EXISTS stations (
    id BIGSERIAL PRIMARY KEY,
    external_code VARCHAR(100) NOT NULL,
    name TEXT NOT NULL,
    provider VARCHAR(50) NOT NULL,
    kind VARCHAR(20) NOT NULL DEFAULT 'station',
    city TEXT,
    country TEXT,
    lat DOUBLE PRECISION,
    lon DOUBLE PRECISION,
    grid_res_km DOUBLE PRECISION,
    source_id BIGINT REFERENCES sources(id),

    UNIQUE(provider, external_code)
);

CREATE TABLE IF NOT EXISTS measurements (
    id BIGSERIAL PRIMARY KEY,
    station_id BIGINT NOT NULL REFERENCES stations(id),
    ts TIMESTAMPTZ NOT NULL,
    pm10 DOUBLE PRECISION,
    pm25 DOUBLE PRECISION,
    pm10_grade SMALLINT,
    pm25_grade SMALLINT,
    unit_pm10 VARCHAR(20),
    unit_pm25 VARCHAR(20),
    source_quality VARCHAR(20) NOT NULL DEFAULT 'observed',
    aqi_provider VARCHAR(50),
    raw JSONB,
    source_id BIGINT REFERENCES sources(id),

    UNIQUE(station_id, ts)
);

CREATE INDEX IF NOT EXISTS idx_measurements_station_ts ON measurements(station_id, ts DESC);

CREATE TABLE IF NOT EXISTS fires (
    id BIGSERIAL PRIMARY KEY,
    detected_at TIMESTAMPTZ NOT NULL,
    lat DOUBLE PRECISION NOT NULL,
    lon DOUBLE PRECISION NOT NULL,
    satellite VARCHAR(50) NOT NULL,
    confidence VARCHAR(30),
    frp DOUBLE PRECISION,
    raw JSONB,
    source_code VARCHAR(50) NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_fires_dedup ON fires(source_code, detected_at, lat, lon);
CREATE INDEX IF NOT EXISTS idx_fires_detected_at ON fires(detected_at);
"#;
