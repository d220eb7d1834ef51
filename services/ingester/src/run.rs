//! Per-provider ingestion pipelines.
//!
//! Each run fetches, normalizes and commits one provider feed. A
//! failure on one station or city is logged and skipped; the run only
//! fails when the whole feed is unusable.

use chrono::{Duration, Utc};
use tracing::{info, instrument, warn};

use aq_common::AirResult;
use ingestion::fetch::ProviderClient;
use ingestion::{airkorea, firms, kma, openaq, owm, waqi};
use storage::{AirStore, IngestBatch, IngestCounts};

/// Default AirKorea stations polled when no override is configured.
pub fn default_stations() -> Vec<airkorea::StationSpec> {
    [
        ("111123", "종로구"),
        ("111121", "중구"),
        ("111131", "용산구"),
        ("111142", "성동구"),
        ("111141", "광진구"),
        ("111152", "동대문구"),
        ("111151", "중랑구"),
        ("111161", "성북구"),
        ("111261", "강남구"),
        ("111273", "송파구"),
    ]
    .into_iter()
    .map(|(code, name)| airkorea::StationSpec {
        external_code: code.to_string(),
        name: name.to_string(),
        city: Some("서울".to_string()),
    })
    .collect()
}

#[instrument(skip_all)]
pub async fn run_airkorea(
    store: &dyn AirStore,
    client: &ProviderClient,
    service_key: &str,
    stations: &[airkorea::StationSpec],
) -> AirResult<IngestCounts> {
    let mut batch = IngestBatch::new(airkorea::source());

    for spec in stations {
        let params = airkorea::query_params(service_key, &spec.name);
        match client.get_json(airkorea::PROVIDER, airkorea::FEED_URL, &params).await {
            Ok(payload) => match airkorea::normalize(spec, &payload) {
                Ok((rows, skipped)) => {
                    batch.rows.extend(rows);
                    batch.skipped += skipped;
                }
                Err(e) => {
                    warn!(station = %spec.name, error = %e, "Skipping station payload");
                    batch.skipped += 1;
                }
            },
            Err(e) => {
                warn!(station = %spec.name, error = %e, "Station fetch failed");
                batch.skipped += 1;
            }
        }
    }

    commit(store, batch).await
}

#[instrument(skip_all)]
pub async fn run_waqi(
    store: &dyn AirStore,
    client: &ProviderClient,
    token: &str,
) -> AirResult<IngestCounts> {
    let mut batch = IngestBatch::new(waqi::source());
    let now = Utc::now();

    for city in waqi::CITIES {
        let url = waqi::feed_url(city, token);
        match client.get_json(waqi::PROVIDER, &url, &[]).await {
            Ok(payload) => match waqi::normalize(city, &payload, now) {
                Ok(row) => batch.rows.push(row),
                Err(e) => {
                    warn!(city, error = %e, "Skipping city payload");
                    batch.skipped += 1;
                }
            },
            Err(e) => {
                warn!(city, error = %e, "City fetch failed");
                batch.skipped += 1;
            }
        }
    }

    commit(store, batch).await
}

#[instrument(skip_all)]
pub async fn run_openaq(
    store: &dyn AirStore,
    client: &ProviderClient,
    api_key: Option<&str>,
) -> AirResult<IngestCounts> {
    let params = openaq::query_params();
    let key = api_key.map(|k| ("X-API-Key", k));
    let payload = client
        .get_json_keyed(openaq::PROVIDER, openaq::FEED_URL, &params, key)
        .await?;

    let (rows, skipped) = openaq::normalize(&payload)?;
    let mut batch = IngestBatch::new(openaq::source());
    batch.rows = rows;
    batch.skipped = skipped;

    commit(store, batch).await
}

#[instrument(skip_all)]
pub async fn run_owm(
    store: &dyn AirStore,
    client: &ProviderClient,
    api_key: &str,
) -> AirResult<IngestCounts> {
    let forecast_url = format!("{}/forecast", owm::FEED_URL);
    let mut batch = IngestBatch::new(owm::source());

    for target in owm::TARGETS {
        let params = owm::query_params(target, api_key);
        let current = client.get_json(owm::PROVIDER, owm::FEED_URL, &params).await;
        let forecast = client.get_json(owm::PROVIDER, &forecast_url, &params).await;

        match (current, forecast) {
            (Ok(current), Ok(forecast)) => {
                let (rows, skipped) = owm::normalize(target, &current, &forecast);
                batch.rows.extend(rows);
                batch.skipped += skipped;
            }
            (current, forecast) => {
                if let Err(e) = current {
                    warn!(target = target.name, error = %e, "Current fetch failed");
                }
                if let Err(e) = forecast {
                    warn!(target = target.name, error = %e, "Forecast fetch failed");
                }
                batch.skipped += 1;
            }
        }
    }

    commit(store, batch).await
}

/// Ingest a KMA hourly CSV export from disk.
#[instrument(skip(store, text))]
pub async fn run_kma(store: &dyn AirStore, text: &str) -> AirResult<IngestCounts> {
    let (rows, skipped) = kma::normalize_csv(text)?;
    let mut batch = IngestBatch::new(kma::source());
    batch.rows = rows;
    batch.skipped = skipped;

    commit(store, batch).await
}

/// Summary of a fire ingestion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct FireSummary {
    pub inserted: u64,
    pub skipped: u64,
    pub swept: u64,
}

#[instrument(skip_all)]
pub async fn run_firms(
    store: &dyn AirStore,
    client: &ProviderClient,
    map_key: &str,
) -> AirResult<FireSummary> {
    store.ensure_source(&firms::source()).await?;

    let batch = firms::fetch_and_normalize(client, map_key).await?;
    let inserted = store.insert_fires(firms::SOURCE_CODE, &batch.fires).await?;

    // Retention sweep runs only after a successful batch; a sweep
    // failure must not fail the ingest itself.
    let cutoff = Utc::now() - Duration::days(firms::RETENTION_DAYS);
    let swept = match store.sweep_fires(firms::SOURCE_CODE, cutoff).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Fire retention sweep failed");
            0
        }
    };

    Ok(FireSummary {
        inserted,
        skipped: batch.skipped,
        swept,
    })
}

async fn commit(store: &dyn AirStore, batch: IngestBatch) -> AirResult<IngestCounts> {
    let source = batch.source.code.clone();
    let counts = store.apply_batch(&batch).await?;
    info!(
        source = %source,
        inserted = counts.inserted,
        updated = counts.updated,
        skipped = counts.skipped,
        "Batch committed"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::MemStore;

    const KMA_CSV: &str = "\
지점명,일시,PM10,PM2.5\n\
서울,2026-03-01 14:00,45,22\n\
부산,2026-03-01 14:00,38,18\n";

    #[tokio::test]
    async fn kma_csv_commits_rows() {
        let store = MemStore::new();
        let counts = run_kma(&store, KMA_CSV).await.unwrap();
        assert_eq!(counts.inserted, 2);
        assert_eq!(counts.skipped, 0);
        assert_eq!(store.station_count(), 2);
    }

    #[tokio::test]
    async fn kma_rerun_updates_instead_of_duplicating() {
        let store = MemStore::new();
        run_kma(&store, KMA_CSV).await.unwrap();
        let second = run_kma(&store, KMA_CSV).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.measurement_count(), 2);
    }

    #[test]
    fn default_station_codes_are_unique() {
        let stations = default_stations();
        let mut codes: Vec<_> = stations.iter().map(|s| s.external_code.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), stations.len());
    }
}
