//! Parkwatch - Parking Lot Occupancy Backend
//!
//! Main entry point for the parkwatch server.

use parkwatch::{
    departures::DepartureSweeper,
    frame_source::VideoFileSource,
    inference_client::InferenceClient,
    leaving_soon::LeavingSoonTracker,
    live_export::LiveExporter,
    lot_store::LotRepository,
    occupancy_monitor::OccupancyMonitor,
    state::{AppConfig, AppState},
    web_api,
};
use axum::http::HeaderValue;
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parkwatch=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting parkwatch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        database_url = %config.database_url,
        inference_url = %config.inference_url,
        model_id = %config.model_id,
        video_path = %config.video_path.display(),
        target_lot = %config.target_lot,
        frame_interval_secs = config.frame_interval_secs,
        "Configuration loaded"
    );

    // Create database pool
    let pool = MySqlPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.database_url)
        .await?;

    tracing::info!("Database connected");

    // Initialize components
    let lots = LotRepository::new(pool.clone());
    let inference = Arc::new(InferenceClient::new(
        config.inference_url.clone(),
        config.model_id.clone(),
        config.inference_api_key.clone(),
    ));
    let live_export = LiveExporter::new(config.live_data_path.clone());
    let leaving_soon = Arc::new(LeavingSoonTracker::new(Arc::new(lots.clone())));
    tracing::info!("Lot store, inference client, and leaving-soon tracker initialized");

    // Start departure schedule expiry sweeper
    let sweeper = Arc::new(DepartureSweeper::new(lots.clone()));
    sweeper.start().await;

    // Start occupancy reconciliation loop. An unopenable frame source
    // disables the loop permanently; request serving continues regardless.
    match VideoFileSource::open(&config.video_path).await {
        Ok(source) => {
            let monitor = OccupancyMonitor::new(
                inference.clone(),
                Arc::new(lots.clone()),
                Some(live_export.clone()),
                config.target_lot.clone(),
                config.frame_interval_secs,
                config.confidence_threshold,
            );
            monitor.start(Box::new(source));
            tracing::info!(lot = %config.target_lot, "Occupancy monitor started");
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                video_path = %config.video_path.display(),
                "Occupancy monitor disabled, frame source could not be opened"
            );
        }
    }

    // Cross-origin policy: pin to the configured frontend, open otherwise
    let cors = match &config.frontend_origin {
        Some(origin) => {
            let origin = origin
                .parse::<HeaderValue>()
                .map_err(|_| anyhow::anyhow!("invalid FRONTEND_ORIGIN: {origin}"))?;
            CorsLayer::new()
                .allow_origin(origin)
                .allow_methods(Any)
                .allow_headers(Any)
        }
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let addr = format!("{}:{}", config.host, config.port);

    // Create application state
    let state = AppState {
        pool,
        config,
        lots,
        leaving_soon,
        live_export,
        inference,
    };

    let app = web_api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "HTTP server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
