// Frame sink that fans frames and alert updates out to stream subscribers
use crate::application::frame_sink::{FrameSink, TrajectoryView};
use crate::domain::alert::AlertState;
use crate::domain::frame::FrameView;
use serde::Serialize;
use std::sync::Mutex;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum StreamMessage {
    Trajectories(Vec<TrajectoryView>),
    Frame(FrameView),
    Alerts(AlertState),
}

#[derive(Default)]
struct Latest {
    trajectories: Vec<TrajectoryView>,
    frame: Option<FrameView>,
    alerts: Option<AlertState>,
}

pub struct BroadcastSink {
    tx: broadcast::Sender<StreamMessage>,
    latest: Mutex<Latest>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            latest: Mutex::new(Latest::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.tx.subscribe()
    }

    /// What a new subscriber needs before live updates: the static
    /// trajectories, then the most recent frame and alert state.
    pub fn snapshot(&self) -> Vec<StreamMessage> {
        let latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut messages = vec![StreamMessage::Trajectories(latest.trajectories.clone())];
        messages.extend(latest.frame.clone().map(StreamMessage::Frame));
        messages.extend(latest.alerts.clone().map(StreamMessage::Alerts));
        messages
    }

    fn update(&self, apply: impl FnOnce(&mut Latest)) {
        let mut latest = self.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        apply(&mut latest);
    }

    fn send(&self, message: StreamMessage) {
        // No subscribers is fine
        let _ = self.tx.send(message);
    }
}

impl FrameSink for BroadcastSink {
    fn load_trajectories(&self, trajectories: &[TrajectoryView]) {
        self.update(|latest| latest.trajectories = trajectories.to_vec());
        self.send(StreamMessage::Trajectories(trajectories.to_vec()));
    }

    fn render_frame(&self, frame: &FrameView) {
        self.update(|latest| latest.frame = Some(frame.clone()));
        self.send(StreamMessage::Frame(frame.clone()));
    }

    fn publish_alerts(&self, alerts: &AlertState) {
        self.update(|latest| latest.alerts = Some(alerts.clone()));
        self.send(StreamMessage::Alerts(alerts.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_and_snapshot() {
        let sink = BroadcastSink::new(8);
        assert_eq!(sink.snapshot(), vec![StreamMessage::Trajectories(Vec::new())]);

        let mut rx = sink.subscribe();
        sink.publish_alerts(&AlertState::default());

        assert_eq!(rx.recv().await.unwrap(), StreamMessage::Alerts(AlertState::default()));
        assert_eq!(sink.snapshot().len(), 2);
    }

    #[test]
    fn test_message_shape() {
        let json = serde_json::to_value(StreamMessage::Alerts(AlertState::default())).unwrap();
        assert_eq!(json["type"], "alerts");
        assert_eq!(json["payload"]["critical"], serde_json::json!([]));
    }
}
