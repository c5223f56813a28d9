// Application state for HTTP handlers
use crate::application::playback_service::PlaybackService;
use crate::infrastructure::frame_broadcast::BroadcastSink;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Clone)]
pub struct AppState {
    pub playback: PlaybackService,
    pub frames: Arc<BroadcastSink>,
    /// Flips to true when the server starts draining connections.
    pub shutdown: watch::Receiver<bool>,
}
