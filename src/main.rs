// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{
    routing::{get, post, put},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::enrichment_service::EnrichmentService;
use crate::application::playback_engine::PlaybackEngine;
use crate::application::playback_service::PlaybackService;
use crate::domain::sample::parse_batch;
use crate::domain::series::SeriesIndex;
use crate::infrastructure::config::{load_app_config, DataSettings};
use crate::infrastructure::csv_source::load_csv;
use crate::infrastructure::frame_broadcast::BroadcastSink;
use crate::infrastructure::geocode_cache::CachingGeocoder;
use crate::infrastructure::longdo_geocoder::LongdoGeocoder;
use crate::infrastructure::mock_source::mock_rows;
use crate::infrastructure::tokio_scheduler::TokioScheduler;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    current_alerts, health_check, list_trajectories, pause, play, playback_status, reset, seek,
    set_filter, stream_frames,
};

const FRAME_BUFFER: usize = 64;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Load configuration
    let config = load_app_config()?;
    let settings = config.engine_settings()?;

    // Build the series index (domain layer)
    let index = load_index(&config.data)?;
    tracing::info!(
        entities = index.entity_count(),
        timestamps = index.timeline().len(),
        "playback data ready"
    );

    // Wire the engine to its collaborators (infrastructure layer)
    let (commands, inbox) = PlaybackService::channel();
    let frames = Arc::new(BroadcastSink::new(FRAME_BUFFER));
    let engine = PlaybackEngine::new(
        index,
        settings,
        Box::new(TokioScheduler::new(commands.clone())),
        frames.clone(),
    )?;

    let lookup_timeout = Duration::from_millis(config.enrichment.timeout_ms);
    let geocoder = LongdoGeocoder::new(
        config.enrichment.endpoint.clone(),
        config.enrichment.api_key.clone(),
        lookup_timeout,
    )?;
    let enrichment = EnrichmentService::new(
        Arc::new(CachingGeocoder::new(Arc::new(geocoder))),
        lookup_timeout,
        config.enrichment.placeholder.clone(),
        Duration::from_millis(config.enrichment.delay_step_ms),
    );

    // Start the engine loop (application layer)
    let (playback, engine_task) = PlaybackService::spawn(engine, enrichment, commands, inbox);

    let (stop_streams, shutdown) = watch::channel(false);
    let state = Arc::new(AppState {
        playback: playback.clone(),
        frames,
        shutdown,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/trajectories", get(list_trajectories))
        .route("/playback", get(playback_status))
        .route("/playback/play", post(play))
        .route("/playback/pause", post(pause))
        .route("/playback/reset", post(reset))
        .route("/playback/seek", post(seek))
        .route("/playback/filter", put(set_filter))
        .route("/alerts", get(current_alerts))
        .route("/frames", get(stream_frames))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!(%addr, "starting s4c-playback service");

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(shutdown_signal(stop_streams))
        .await?;

    playback.shutdown();
    engine_task.await?;

    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

/// Load the CSV batch, falling back to mock data when allowed.
fn load_index(data: &DataSettings) -> anyhow::Result<SeriesIndex> {
    let loaded = load_csv(&data.path).and_then(|rows| {
        let batch = parse_batch(rows);
        SeriesIndex::build(batch.samples).map_err(anyhow::Error::from)
    });

    match loaded {
        Ok(index) => Ok(index),
        Err(e) if data.mock_fallback => {
            tracing::warn!(error = %e, path = %data.path, "using mock data instead");
            let batch = parse_batch(mock_rows(chrono::Utc::now(), rand::random()));
            Ok(SeriesIndex::build(batch.samples)?)
        }
        Err(e) => Err(e.context(format!("No playable data in {}", data.path))),
    }
}

/// Waits for Ctrl-C, then ends open frame streams so the drain can finish.
async fn shutdown_signal(stop_streams: watch::Sender<bool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
    let _ = stop_streams.send(true);
}
