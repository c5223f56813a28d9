// Render seam - where frames and alert updates are delivered
use crate::domain::alert::AlertState;
use crate::domain::frame::FrameView;
use crate::domain::series::SeriesSummary;
use serde::Serialize;

/// Full path of one entity, drawn once as the static backdrop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrajectoryView {
    pub entity_id: String,
    pub summary: SeriesSummary,
    pub path: Vec<[f64; 2]>,
}

pub trait FrameSink: Send + Sync {
    fn load_trajectories(&self, trajectories: &[TrajectoryView]);

    fn render_frame(&self, frame: &FrameView);

    fn publish_alerts(&self, alerts: &AlertState);
}
