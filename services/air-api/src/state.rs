//! Application state for the air API.

use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use storage::PgStore;

use crate::kakao::KakaoClient;
use crate::openmeteo::OpenMeteoClient;

const DEFAULT_CACHE_TTL_SECS: u64 = 120;

/// Shared application state.
pub struct AppState {
    /// Canonical store. Absent when DATABASE_URL is not configured;
    /// the service then serves model-backed answers only.
    pub store: Option<Arc<PgStore>>,

    /// Open-Meteo client with its payload cache.
    pub openmeteo: OpenMeteoClient,

    /// Kakao geocoder. Absent when KAKAO_REST_KEY is not configured;
    /// the geo endpoints then answer 503.
    pub kakao: Option<KakaoClient>,
}

impl AppState {
    /// Create a new AppState from environment configuration.
    pub async fn new() -> Result<Self> {
        let store = match std::env::var("DATABASE_URL") {
            Ok(url) => {
                let store = PgStore::connect(&url).await?;
                store.migrate().await?;
                Some(Arc::new(store))
            }
            Err(_) => {
                warn!("DATABASE_URL not set, station lookups disabled");
                None
            }
        };

        let cache_ttl: u64 = std::env::var("AIR_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        let kakao = match std::env::var("KAKAO_REST_KEY") {
            Ok(key) if !key.trim().is_empty() => Some(KakaoClient::new(key)?),
            _ => {
                warn!("KAKAO_REST_KEY not set, geocoding disabled");
                None
            }
        };

        Ok(Self {
            store,
            openmeteo: OpenMeteoClient::new(cache_ttl)?,
            kakao,
        })
    }
}
