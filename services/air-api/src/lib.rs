//! Unified Air Quality API
//!
//! HTTP server resolving nearest readings from the canonical store
//! and serving merged pollutant/weather forecasts from Open-Meteo.

pub mod handlers;
pub mod kakao;
pub mod openmeteo;
pub mod response_cache;
pub mod state;
