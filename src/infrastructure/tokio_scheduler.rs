// Tokio-backed tick scheduler
use crate::application::playback_service::{CommandSender, PlaybackCommand};
use crate::application::scheduler::{Scheduler, TickGate, TickHandle};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};

/// Runs each armed schedule as a task that posts `Tick` commands back into
/// the engine's channel. Cancelling the handle aborts the task. Periods that
/// elapse while a tick is still queued are skipped.
pub struct TokioScheduler {
    commands: CommandSender,
}

impl TokioScheduler {
    pub fn new(commands: CommandSender) -> Self {
        Self { commands }
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&mut self, interval: Duration, generation: u64) -> TickHandle {
        let commands = self.commands.clone();
        let gate = TickGate::default();
        let pending = gate.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if !pending.try_claim() {
                    continue;
                }
                if commands.send(PlaybackCommand::Tick { generation }).is_err() {
                    break;
                }
            }
        });

        tracing::trace!(generation, ?interval, "tick armed");
        TickHandle::new(generation, gate, move || task.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::playback_service::PlaybackService;

    fn drain(inbox: &mut crate::application::playback_service::CommandReceiver) -> usize {
        let mut ticks = 0;
        while let Ok(command) = inbox.try_recv() {
            assert!(matches!(command, PlaybackCommand::Tick { generation: 4 }));
            ticks += 1;
        }
        ticks
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_until_cancelled() {
        let (commands, mut inbox) = PlaybackService::channel();
        let mut scheduler = TokioScheduler::new(commands);
        let handle = scheduler.schedule_repeating(Duration::from_millis(100), 4);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(drain(&mut inbox), 1);
        handle.acknowledge();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(drain(&mut inbox), 1);
        handle.acknowledge();

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(drain(&mut inbox), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_consumer_sees_one_pending_tick() {
        let (commands, mut inbox) = PlaybackService::channel();
        let mut scheduler = TokioScheduler::new(commands);
        let handle = scheduler.schedule_repeating(Duration::from_millis(1), 4);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(drain(&mut inbox), 1);

        handle.acknowledge();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(drain(&mut inbox), 1);
    }
}
