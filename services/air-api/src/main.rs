//! Air API Server
//!
//! Serves unified nearest-reading and forecast queries over the
//! canonical air quality store and Open-Meteo.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use air_api::handlers;
use air_api::state::AppState;

/// Air API Server
#[derive(Parser, Debug)]
#[command(name = "air-api")]
#[command(about = "Unified air quality and forecast API server")]
struct Args {
    /// Listen address
    #[arg(short, long, default_value = "0.0.0.0:8080", env = "AIR_LISTEN_ADDR")]
    listen: String,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .json()
        .init();

    info!("Starting air API server");

    let state = Arc::new(AppState::new().await?);

    let app = Router::new()
        .route("/", get(handlers::landing::landing_handler))
        .route("/nearest", get(handlers::nearest::nearest_handler))
        .route("/forecast", get(handlers::forecast::forecast_handler))
        .route("/geo/address", get(handlers::geo::address_handler))
        .route("/geo/reverse", get(handlers::geo::reverse_handler))
        .route("/healthz", get(handlers::health::health_handler))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = args.listen.parse()?;
    info!("Air API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
