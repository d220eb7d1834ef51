//! Ingester configuration from environment variables.

use aq_common::{AirError, AirResult};

/// Credentials and connection settings. Provider keys are optional at
/// load time; a run that needs a missing key fails fast with a
/// configuration error before touching the network.
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    pub database_url: String,
    pub airkorea_key: Option<String>,
    pub waqi_token: Option<String>,
    pub openaq_key: Option<String>,
    pub owm_api_key: Option<String>,
    pub firms_map_key: Option<String>,
}

impl IngesterConfig {
    pub fn from_env() -> AirResult<Self> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| AirError::ConfigMissing("DATABASE_URL".to_string()))?,
            airkorea_key: optional("AIRKOREA_KEY"),
            waqi_token: optional("WAQI_TOKEN"),
            openaq_key: optional("OPENAQ_API_KEY"),
            owm_api_key: optional("OWM_API_KEY"),
            firms_map_key: optional("FIRMS_MAP_KEY"),
        })
    }
}

fn optional(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Unwrap a provider credential or fail with the variable name.
pub fn require<'a>(value: &'a Option<String>, var: &str) -> AirResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| AirError::ConfigMissing(var.to_string()))
}
