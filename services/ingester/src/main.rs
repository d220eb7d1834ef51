//! Air quality and fire data ingester.
//!
//! Polls the configured providers (AirKorea, WAQI, OpenAQ,
//! OpenWeatherMap, NASA FIRMS) and commits normalized batches to the
//! canonical store. KMA hourly exports are ingested from local CSV.

mod config;
mod run;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{require, IngesterConfig};
use ingestion::fetch::ProviderClient;
use storage::PgStore;

#[derive(Parser, Debug)]
#[command(name = "ingester")]
#[command(about = "Air quality and fire data ingester")]
struct Args {
    #[command(subcommand)]
    provider: Provider,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Provider {
    /// AirKorea ground station feed
    Airkorea,
    /// WAQI city feeds
    Waqi,
    /// OpenAQ aggregate measurements
    Openaq,
    /// OpenWeatherMap model grid
    Owm,
    /// NASA FIRMS fire detections, with retention sweep
    Firms,
    /// KMA hourly CSV export from disk
    Kma {
        /// Path to the CSV file
        csv: PathBuf,
    },
    /// Every network provider with configured credentials
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = IngesterConfig::from_env()?;
    let store = PgStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let client = ProviderClient::new()?;

    info!("Starting ingestion run");

    match &args.provider {
        Provider::Airkorea => {
            let key = require(&config.airkorea_key, "AIRKOREA_KEY")?;
            let stations = run::default_stations();
            run::run_airkorea(&store, &client, key, &stations).await?;
        }
        Provider::Waqi => {
            let token = require(&config.waqi_token, "WAQI_TOKEN")?;
            run::run_waqi(&store, &client, token).await?;
        }
        Provider::Openaq => {
            run::run_openaq(&store, &client, config.openaq_key.as_deref()).await?;
        }
        Provider::Owm => {
            let key = require(&config.owm_api_key, "OWM_API_KEY")?;
            run::run_owm(&store, &client, key).await?;
        }
        Provider::Firms => {
            let key = require(&config.firms_map_key, "FIRMS_MAP_KEY")?;
            let summary = run::run_firms(&store, &client, key).await?;
            info!(
                inserted = summary.inserted,
                skipped = summary.skipped,
                swept = summary.swept,
                "Fire batch committed"
            );
        }
        Provider::Kma { csv } => {
            let text = std::fs::read_to_string(csv)?;
            run::run_kma(&store, &text).await?;
        }
        Provider::All => run_all(&store, &client, &config).await?,
    }

    info!("Ingestion run complete");
    Ok(())
}

/// Run every network provider that has credentials configured. A
/// provider failure is logged and does not abort the others.
async fn run_all(store: &PgStore, client: &ProviderClient, config: &IngesterConfig) -> Result<()> {
    if let Some(key) = config.airkorea_key.as_deref() {
        let stations = run::default_stations();
        if let Err(e) = run::run_airkorea(store, client, key, &stations).await {
            warn!(error = %e, "AirKorea run failed");
        }
    } else {
        warn!("AIRKOREA_KEY not set, skipping AirKorea");
    }

    if let Some(token) = config.waqi_token.as_deref() {
        if let Err(e) = run::run_waqi(store, client, token).await {
            warn!(error = %e, "WAQI run failed");
        }
    } else {
        warn!("WAQI_TOKEN not set, skipping WAQI");
    }

    if let Err(e) = run::run_openaq(store, client, config.openaq_key.as_deref()).await {
        warn!(error = %e, "OpenAQ run failed");
    }

    if let Some(key) = config.owm_api_key.as_deref() {
        if let Err(e) = run::run_owm(store, client, key).await {
            warn!(error = %e, "OpenWeatherMap run failed");
        }
    } else {
        warn!("OWM_API_KEY not set, skipping OpenWeatherMap");
    }

    if let Some(key) = config.firms_map_key.as_deref() {
        match run::run_firms(store, client, key).await {
            Ok(summary) => info!(
                inserted = summary.inserted,
                skipped = summary.skipped,
                swept = summary.swept,
                "Fire batch committed"
            ),
            Err(e) => warn!(error = %e, "FIRMS run failed"),
        }
    } else {
        warn!("FIRMS_MAP_KEY not set, skipping FIRMS");
    }

    Ok(())
}
