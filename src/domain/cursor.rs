// Playback cursor state machine
use crate::domain::error::EngineError;
use std::time::Duration;

/// Shortest period a timer can be armed with.
const MIN_TICK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    Stopped,
    Playing,
}

/// Position over a timeline of fixed length. Timer arming lives with the
/// engine; this type only tracks where playback is and whether it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackCursor {
    position: usize,
    length: usize,
    state: CursorState,
}

impl PlaybackCursor {
    /// A new cursor starts at 0 and playing.
    pub fn new(length: usize) -> Result<Self, EngineError> {
        if length == 0 {
            return Err(EngineError::EmptyDataset);
        }
        Ok(Self {
            position: 0,
            length,
            state: CursorState::Playing,
        })
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn length(&self) -> usize {
        self.length
    }

    #[cfg(test)]
    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == CursorState::Playing
    }

    pub fn seek(&mut self, position: usize) -> usize {
        self.position = position.min(self.length - 1);
        self.position
    }

    /// Returns true when this call started playback.
    pub fn play(&mut self) -> bool {
        let started = self.state == CursorState::Stopped;
        self.state = CursorState::Playing;
        started
    }

    /// Returns true when this call stopped playback.
    pub fn pause(&mut self) -> bool {
        let stopped = self.state == CursorState::Playing;
        self.state = CursorState::Stopped;
        stopped
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Step forward one instant, wrapping to the start.
    pub fn advance(&mut self) -> usize {
        self.position = (self.position + 1) % self.length;
        self.position
    }

    pub fn progress_percent(&self) -> u8 {
        if self.length == 1 {
            return 100;
        }
        ((self.position as f64 / (self.length - 1) as f64) * 100.0).round() as u8
    }

    /// A fixed total sweep spread evenly over every timeline point, never
    /// shorter than `floor` or one millisecond.
    pub fn tick_interval(&self, total: Duration, floor: Duration) -> Duration {
        let steps = u32::try_from(self.length).unwrap_or(u32::MAX);
        (total / steps).max(floor).max(MIN_TICK_INTERVAL)
    }
}
