// Playback engine - cursor, frame resolution and alerting driven together
use crate::application::frame_sink::{FrameSink, TrajectoryView};
use crate::application::scheduler::{Scheduler, TickHandle};
use crate::domain::alert::{AlertState, AlertTracker, EnrichmentResult, LookupRequest};
use crate::domain::cursor::PlaybackCursor;
use crate::domain::error::EngineError;
use crate::domain::frame::{format_time_label, resolve, ActiveSet, FrameView, VisibleEntity};
use crate::domain::series::SeriesIndex;
use crate::domain::tier::{TierBoundaries, TierFilter};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub boundaries: TierBoundaries,
    pub alert_threshold: f64,
    pub filter: TierFilter,
    pub total_duration: Duration,
    pub min_tick_interval: Duration,
    pub enrichment_delay_step: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            boundaries: TierBoundaries::default(),
            alert_threshold: 0.40,
            filter: TierFilter::default(),
            total_duration: Duration::from_secs(20),
            min_tick_interval: Duration::ZERO,
            enrichment_delay_step: Duration::from_millis(300),
        }
    }
}

/// Read-only progress information for the control surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub position: usize,
    pub length: usize,
    pub playing: bool,
    pub time: DateTime<Utc>,
    pub time_label: String,
    pub progress_percent: u8,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Single-owner playback engine.
///
/// Every method that recomputes a frame pushes it to the sink and returns the
/// enrichment lookups the frame produced; dispatching them is the caller's
/// job. Dropping the engine cancels any armed tick.
pub struct PlaybackEngine {
    index: SeriesIndex,
    cursor: PlaybackCursor,
    boundaries: TierBoundaries,
    filter: TierFilter,
    total_duration: Duration,
    min_tick_interval: Duration,
    alerts: AlertTracker,
    scheduler: Box<dyn Scheduler>,
    tick: Option<TickHandle>,
    generation: u64,
    sink: Arc<dyn FrameSink>,
}

impl PlaybackEngine {
    pub fn new(
        index: SeriesIndex,
        settings: EngineSettings,
        scheduler: Box<dyn Scheduler>,
        sink: Arc<dyn FrameSink>,
    ) -> Result<Self, EngineError> {
        if settings.total_duration.is_zero() {
            return Err(EngineError::InvalidConfig(
                "total playback duration must be positive".to_string(),
            ));
        }
        if !settings.alert_threshold.is_finite() {
            return Err(EngineError::InvalidConfig(
                "alert threshold must be finite".to_string(),
            ));
        }

        let cursor = PlaybackCursor::new(index.timeline().len())?;

        Ok(Self {
            index,
            cursor,
            boundaries: settings.boundaries,
            filter: settings.filter,
            total_duration: settings.total_duration,
            min_tick_interval: settings.min_tick_interval,
            alerts: AlertTracker::new(settings.alert_threshold, settings.enrichment_delay_step),
            scheduler,
            tick: None,
            generation: 0,
            sink,
        })
    }

    /// Hand the static trajectories to the sink, arm the tick and draw the
    /// first frame.
    pub fn start(&mut self) -> Vec<LookupRequest> {
        let trajectories = self.trajectories();
        self.sink.load_trajectories(&trajectories);

        if self.cursor.is_playing() {
            self.arm();
        }
        self.recompute()
    }

    pub fn trajectories(&self) -> Vec<TrajectoryView> {
        self.index
            .series()
            .map(|series| TrajectoryView {
                entity_id: series.entity_id().to_string(),
                summary: series.summary(),
                path: series
                    .samples()
                    .iter()
                    .map(|s| [s.latitude, s.longitude])
                    .collect(),
            })
            .collect()
    }

    pub fn seek(&mut self, position: usize) -> Vec<LookupRequest> {
        let position = self.cursor.seek(position);
        tracing::debug!(position, "seek");
        self.recompute()
    }

    pub fn play(&mut self) {
        let started = self.cursor.play();
        if started || self.tick.is_none() {
            tracing::debug!(position = self.cursor.position(), "play");
            self.arm();
        }
        if started {
            self.redraw();
        }
    }

    pub fn pause(&mut self) {
        let stopped = self.cursor.pause();
        self.disarm();
        if stopped {
            tracing::debug!(position = self.cursor.position(), "pause");
            self.redraw();
        }
    }

    pub fn reset(&mut self) -> Vec<LookupRequest> {
        self.disarm();
        self.cursor.reset();
        tracing::debug!(playing = self.cursor.is_playing(), "reset");
        if self.cursor.is_playing() {
            self.arm();
        }
        self.recompute()
    }

    /// Advance one step if `generation` matches the armed schedule.
    pub fn tick(&mut self, generation: u64) -> Vec<LookupRequest> {
        let armed = match &self.tick {
            Some(handle) if handle.generation() == generation => {
                handle.acknowledge();
                generation
            }
            other => {
                let armed = other.as_ref().map(TickHandle::generation);
                tracing::trace!(generation, ?armed, "ignoring stale tick");
                return Vec::new();
            }
        };

        tracing::trace!(generation = armed, "tick");
        self.cursor.advance();
        self.recompute()
    }

    pub fn set_filter(&mut self, filter: TierFilter) -> Vec<LookupRequest> {
        tracing::debug!(tiers = ?filter.tiers().collect::<Vec<_>>(), "visibility filter changed");
        self.filter = filter;
        self.recompute()
    }

    pub fn apply_enrichment(&mut self, result: EnrichmentResult) {
        if let Some(state) = self.alerts.apply(result) {
            self.sink.publish_alerts(&state);
        }
    }

    pub fn alerts(&self) -> &AlertState {
        self.alerts.state()
    }

    pub fn status(&self) -> PlaybackStatus {
        let timeline = self.index.timeline();
        let time = timeline
            .get(self.cursor.position())
            .unwrap_or_else(|| timeline.last());

        PlaybackStatus {
            position: self.cursor.position(),
            length: self.cursor.length(),
            playing: self.cursor.is_playing(),
            time,
            time_label: format_time_label(time),
            progress_percent: self.cursor.progress_percent(),
            start_time: timeline.first(),
            end_time: timeline.last(),
        }
    }

    fn arm(&mut self) {
        self.disarm();
        self.generation += 1;
        let interval = self
            .cursor
            .tick_interval(self.total_duration, self.min_tick_interval);
        self.tick = Some(self.scheduler.schedule_repeating(interval, self.generation));
    }

    fn disarm(&mut self) {
        if let Some(handle) = self.tick.take() {
            handle.cancel();
        }
    }

    /// Re-render the current frame without touching alert state.
    fn redraw(&self) {
        let active = resolve(&self.index, self.cursor.position(), &self.boundaries);
        self.render(&active);
    }

    fn recompute(&mut self) -> Vec<LookupRequest> {
        let active = resolve(&self.index, self.cursor.position(), &self.boundaries);
        self.render(&active);

        let outcome = self.alerts.observe(&active);
        if let Some(state) = &outcome.update {
            self.sink.publish_alerts(state);
        }
        outcome.lookups
    }

    fn render(&self, active: &ActiveSet<'_>) {
        let frame = FrameView {
            position: self.cursor.position(),
            length: self.cursor.length(),
            playing: self.cursor.is_playing(),
            time: active.time,
            time_label: format_time_label(active.time),
            progress_percent: self.cursor.progress_percent(),
            counts: active.counts(),
            visible: active
                .visible(&self.filter)
                .map(VisibleEntity::from_entry)
                .collect(),
        };
        tracing::trace!(
            position = frame.position,
            active = frame.counts.total,
            visible = frame.visible.len(),
            "frame"
        );
        self.sink.render_frame(&frame);
    }
}
