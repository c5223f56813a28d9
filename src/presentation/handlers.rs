// HTTP request handlers
use crate::application::playback_service::ServiceError;
use crate::domain::tier::{Tier, TierFilter};
use crate::infrastructure::chunked_json::stream_from_broadcast;
use crate::presentation::app_state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct SeekRequest {
    pub index: usize,
}

#[derive(Deserialize)]
pub struct FilterRequest {
    pub tiers: Vec<Tier>,
}

fn respond<T: Serialize>(result: Result<T, ServiceError>) -> Response {
    match result {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "playback request failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Full trajectories with per-entity summaries
pub async fn list_trajectories(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.trajectories().await)
}

pub async fn playback_status(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.status().await)
}

pub async fn play(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.play().await)
}

pub async fn pause(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.pause().await)
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.reset().await)
}

pub async fn seek(State(state): State<Arc<AppState>>, Json(request): Json<SeekRequest>) -> Response {
    respond(state.playback.seek(request.index).await)
}

pub async fn set_filter(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FilterRequest>,
) -> Response {
    respond(state.playback.set_filter(TierFilter::new(request.tiers)).await)
}

pub async fn current_alerts(State(state): State<Arc<AppState>>) -> Response {
    respond(state.playback.alerts().await)
}

/// Stream frames and alert updates as they are produced
pub async fn stream_frames(headers: HeaderMap, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    // Check if client accepts Brotli compression
    let compress = headers
        .get("accept-encoding")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.contains("br"))
        .unwrap_or(false);

    let rx = state.frames.subscribe();
    let snapshot = state.frames.snapshot();
    stream_from_broadcast(snapshot, rx, state.shutdown.clone(), compress).await
}
