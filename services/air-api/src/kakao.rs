//! Kakao Local geocoding client.
//!
//! Forward address search and coordinate-to-address reverse lookup,
//! with payloads cached for five minutes so repeated lookups of the
//! same place skip the upstream call.

use serde::Serialize;
use serde_json::Value;

use aq_common::{AirError, AirResult};
use ingestion::fetch::ProviderClient;

use crate::response_cache::{CacheKey, ResponseCache};

pub const PROVIDER: &str = "KAKAO";

pub const ADDRESS_URL: &str = "https://dapi.kakao.com/v2/local/search/address.json";
pub const REVERSE_URL: &str = "https://dapi.kakao.com/v2/local/geo/coord2address.json";

const TIMEOUT_SECS: u64 = 5;
const CACHE_TTL_SECS: u64 = 300;

/// A resolved placement, shared by both lookup directions.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeoPlace {
    pub lat: f64,
    pub lon: f64,
    pub address: String,
    pub source: &'static str,
}

pub struct KakaoClient {
    client: ProviderClient,
    cache: ResponseCache,
    rest_key: String,
}

impl KakaoClient {
    pub fn new(rest_key: String) -> AirResult<Self> {
        Ok(Self {
            client: ProviderClient::with_timeout(TIMEOUT_SECS)?,
            cache: ResponseCache::new(CACHE_TTL_SECS),
            rest_key,
        })
    }

    /// Resolve a free-text address query to a coordinate.
    pub async fn address(&self, query: &str) -> AirResult<GeoPlace> {
        let trimmed = query.trim();
        let key = CacheKey::new("addr", 0.0, 0.0, &[trimmed]);
        let params = [
            ("query", trimmed.to_string()),
            ("page", "1".to_string()),
            ("size", "10".to_string()),
            ("analyze_type", "similar".to_string()),
        ];

        let payload = self.fetch_cached(&key, ADDRESS_URL, &params).await?;
        parse_address(&payload)
    }

    /// Resolve a coordinate to the nearest known address.
    pub async fn reverse(&self, lat: f64, lon: f64) -> AirResult<GeoPlace> {
        let key = CacheKey::new("rev", lat, lon, &[]);
        // Kakao takes y=lat, x=lon.
        let params = [("y", lat.to_string()), ("x", lon.to_string())];

        let payload = self.fetch_cached(&key, REVERSE_URL, &params).await?;
        parse_reverse(&payload, lat, lon)
    }

    async fn fetch_cached(
        &self,
        key: &CacheKey,
        url: &str,
        params: &[(&str, String)],
    ) -> AirResult<Value> {
        if let Some(cached) = self.cache.get(key).await {
            return Ok(cached);
        }

        let auth = format!("KakaoAK {}", self.rest_key);
        let payload = self
            .client
            .get_json_keyed(PROVIDER, url, params, Some(("Authorization", auth.as_str())))
            .await?;
        self.cache.put(key, payload.clone()).await;
        Ok(payload)
    }
}

fn first_document(payload: &Value) -> Option<&Value> {
    payload
        .get("documents")
        .and_then(Value::as_array)
        .and_then(|docs| docs.first())
}

/// Field on the document itself, or nested under its "address" block.
fn doc_field<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    doc.get(field)
        .filter(|v| !v.is_null())
        .or_else(|| {
            doc.get("address")
                .and_then(|a| a.get(field))
                .filter(|v| !v.is_null())
        })
}

fn coord(doc: &Value, field: &str) -> Option<f64> {
    let v = doc_field(doc, field)?;
    // Kakao serializes coordinates as strings.
    v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))
}

/// Parse a forward search payload. An empty document list is the
/// no-data outcome, not an upstream failure.
pub fn parse_address(payload: &Value) -> AirResult<GeoPlace> {
    let doc = first_document(payload).ok_or(AirError::NoData)?;

    // Kakao reports x=lon, y=lat.
    let lon = coord(doc, "x").ok_or(AirError::EmptyUpstream { provider: PROVIDER })?;
    let lat = coord(doc, "y").ok_or(AirError::EmptyUpstream { provider: PROVIDER })?;
    let address = doc_field(doc, "address_name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(GeoPlace {
        lat,
        lon,
        address,
        source: "kakao",
    })
}

/// Parse a reverse payload, preferring the road address and falling
/// back to the lot-number address, then to bare coordinates.
pub fn parse_reverse(payload: &Value, lat: f64, lon: f64) -> AirResult<GeoPlace> {
    let doc = first_document(payload).ok_or(AirError::NoData)?;

    let address = doc
        .get("road_address")
        .and_then(|a| a.get("address_name"))
        .and_then(Value::as_str)
        .or_else(|| {
            doc.get("address")
                .and_then(|a| a.get("address_name"))
                .and_then(Value::as_str)
        })
        .map(str::to_string)
        .unwrap_or_else(|| format!("{},{}", lat, lon));

    Ok(GeoPlace {
        lat,
        lon,
        address,
        source: "kakao",
    })
}
