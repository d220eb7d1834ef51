//! Open-Meteo forecast client.
//!
//! Fetches the hourly air-quality and weather series on the Asia/Seoul
//! time axis, caching parsed payloads per rounded coordinate.

use serde_json::Value;

use aq_common::{AirError, AirResult, PollutantHourly, WeatherHourly};
use ingestion::fetch::ProviderClient;

use crate::response_cache::{CacheKey, ResponseCache};

pub const PROVIDER: &str = "OPENMETEO";

pub const AIR_QUALITY_URL: &str = "https://air-quality-api.open-meteo.com/v1/air-quality";
pub const WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Hourly pollutant fields requested from the air-quality endpoint.
pub const POLLUTANT_KEYS: &[&str] = &[
    "pm2_5",
    "pm10",
    "ozone",
    "nitrogen_dioxide",
    "sulphur_dioxide",
    "carbon_monoxide",
];

/// Hourly meteorology fields requested from the forecast endpoint.
pub const MET_KEYS: &[&str] = &["wind_speed_10m", "wind_direction_10m", "precipitation"];

const TIMEZONE: &str = "Asia/Seoul";
const TIMEOUT_SECS: u64 = 15;

pub struct OpenMeteoClient {
    client: ProviderClient,
    cache: ResponseCache,
}

impl OpenMeteoClient {
    pub fn new(cache_ttl_secs: u64) -> AirResult<Self> {
        Ok(Self {
            client: ProviderClient::with_timeout(TIMEOUT_SECS)?,
            cache: ResponseCache::new(cache_ttl_secs),
        })
    }

    /// Hourly pollutant series at a coordinate.
    pub async fn hourly_air(&self, lat: f64, lon: f64) -> AirResult<PollutantHourly> {
        let key = CacheKey::new("aq", lat, lon, POLLUTANT_KEYS);
        let payload = self
            .fetch_cached(&key, AIR_QUALITY_URL, lat, lon, POLLUTANT_KEYS)
            .await?;
        parse_pollutants(&payload)
    }

    /// Hourly wind and precipitation series at a coordinate.
    pub async fn hourly_weather(&self, lat: f64, lon: f64) -> AirResult<WeatherHourly> {
        let key = CacheKey::new("wx", lat, lon, MET_KEYS);
        let payload = self
            .fetch_cached(&key, WEATHER_URL, lat, lon, MET_KEYS)
            .await?;
        parse_weather(&payload)
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    async fn fetch_cached(
        &self,
        key: &CacheKey,
        url: &str,
        lat: f64,
        lon: f64,
        fields: &[&str],
    ) -> AirResult<Value> {
        if let Some(cached) = self.cache.get(key).await {
            return Ok(cached);
        }

        let query = [
            ("latitude", lat.to_string()),
            ("longitude", lon.to_string()),
            ("hourly", fields.join(",")),
            ("timezone", TIMEZONE.to_string()),
        ];
        let payload = self.client.get_json(PROVIDER, url, &query).await?;
        self.cache.put(key, payload.clone()).await;
        Ok(payload)
    }
}

fn hourly_block(payload: &Value) -> AirResult<&Value> {
    payload
        .get("hourly")
        .filter(|h| h.is_object())
        .ok_or(AirError::EmptyUpstream { provider: "openmeteo" })
}

fn string_series(block: &Value, field: &str) -> Vec<String> {
    block
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn number_series(block: &Value, field: &str) -> Vec<Option<f64>> {
    block
        .get(field)
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(Value::as_f64).collect())
        .unwrap_or_default()
}

/// Parse an air-quality payload into aligned pollutant series.
pub fn parse_pollutants(payload: &Value) -> AirResult<PollutantHourly> {
    let block = hourly_block(payload)?;
    Ok(PollutantHourly {
        time: string_series(block, "time"),
        pm10: number_series(block, "pm10"),
        pm25: number_series(block, "pm2_5"),
        o3: number_series(block, "ozone"),
        no2: number_series(block, "nitrogen_dioxide"),
        so2: number_series(block, "sulphur_dioxide"),
        co: number_series(block, "carbon_monoxide"),
    })
}

/// Parse a weather payload into aligned meteorology series.
pub fn parse_weather(payload: &Value) -> AirResult<WeatherHourly> {
    let block = hourly_block(payload)?;
    Ok(WeatherHourly {
        time: string_series(block, "time"),
        wind_speed: number_series(block, "wind_speed_10m"),
        wind_dir: number_series(block, "wind_direction_10m"),
        precip: number_series(block, "precipitation"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_pollutant_series_with_nulls() {
        let payload = json!({
            "hourly": {
                "time": ["2026-03-01T09:00", "2026-03-01T10:00"],
                "pm10": [30.0, null],
                "pm2_5": [12.5, 13.0],
                "ozone": [40.0, 41.0]
            }
        });

        let parsed = parse_pollutants(&payload).unwrap();
        assert_eq!(parsed.time.len(), 2);
        assert_eq!(parsed.pm10, vec![Some(30.0), None]);
        assert_eq!(parsed.pm25, vec![Some(12.5), Some(13.0)]);
        // Fields absent from the payload come back empty, not zeroed.
        assert!(parsed.no2.is_empty());
    }

    #[test]
    fn parses_weather_series() {
        let payload = json!({
            "hourly": {
                "time": ["2026-03-01T09:00"],
                "wind_speed_10m": [3.4],
                "wind_direction_10m": [270.0],
                "precipitation": [0.0]
            }
        });

        let parsed = parse_weather(&payload).unwrap();
        assert_eq!(parsed.wind_speed, vec![Some(3.4)]);
        assert_eq!(parsed.wind_dir, vec![Some(270.0)]);
    }

    #[test]
    fn missing_hourly_block_is_empty_upstream() {
        let err = parse_pollutants(&json!({"error": true})).unwrap_err();
        assert_eq!(err.http_status_code(), 502);
    }
}
