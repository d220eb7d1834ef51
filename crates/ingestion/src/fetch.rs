//! Provider fetch capability.
//!
//! Thin reqwest wrapper that distinguishes transport/HTTP failures
//! from "fetch succeeded but the payload is unusable". Every call
//! carries a fixed bounded timeout; exceeding it surfaces as an
//! upstream-unavailable failure.

use reqwest::Client;
use tracing::debug;

use aq_common::{AirError, AirResult};

const DEFAULT_TIMEOUT_SECS: u64 = 20;

/// Shared HTTP client for provider calls.
#[derive(Clone)]
pub struct ProviderClient {
    client: Client,
}

impl ProviderClient {
    pub fn new() -> AirResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(timeout_secs: u64) -> AirResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AirError::Internal(format!("HTTP client build failed: {}", e)))?;
        Ok(Self { client })
    }

    /// GET a JSON payload.
    pub async fn get_json(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> AirResult<serde_json::Value> {
        self.get_json_keyed(provider, url, query, None).await
    }

    /// GET a JSON payload, optionally attaching an API key header.
    pub async fn get_json_keyed(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, String)],
        api_key: Option<(&str, &str)>,
    ) -> AirResult<serde_json::Value> {
        debug!(provider, url, "Fetching JSON payload");

        let mut request = self.client.get(url).query(query);
        if let Some((header, value)) = api_key {
            request = request.header(header, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AirError::Upstream {
                provider,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AirError::Upstream {
                provider,
                message: format!("HTTP {}", response.status()),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|_| AirError::EmptyUpstream { provider })
    }

    /// GET a text payload (CSV feeds).
    pub async fn get_text(
        &self,
        provider: &'static str,
        url: &str,
        query: &[(&str, String)],
    ) -> AirResult<String> {
        debug!(provider, url, "Fetching text payload");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AirError::Upstream {
                provider,
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(AirError::Upstream {
                provider,
                message: format!("HTTP {}", response.status()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|_| AirError::EmptyUpstream { provider })?;

        if body.trim().is_empty() {
            return Err(AirError::EmptyUpstream { provider });
        }
        Ok(body)
    }
}
