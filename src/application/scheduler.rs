// Scheduler seam for the playback tick
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Arms repeating ticks for the playback engine.
///
/// Each armed schedule is tagged with a generation number that the ticks
/// carry back, so the engine can drop ticks queued before a cancel.
pub trait Scheduler: Send {
    fn schedule_repeating(&mut self, interval: Duration, generation: u64) -> TickHandle;
}

/// Shared between a running schedule and its handle. At most one tick may
/// be queued at a time: the schedule claims the slot before posting and the
/// engine releases it once the tick has been handled.
#[derive(Debug, Clone, Default)]
pub struct TickGate(Arc<AtomicBool>);

impl TickGate {
    /// False while an earlier tick is still waiting to be handled.
    pub fn try_claim(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    pub fn release(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to one armed schedule. Cancelling or dropping it stops the ticks.
pub struct TickHandle {
    generation: u64,
    gate: TickGate,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TickHandle {
    pub fn new(generation: u64, gate: TickGate, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            generation,
            gate,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mark the pending tick as handled so the schedule may post the next.
    pub fn acknowledge(&self) {
        self.gate.release();
    }

    pub fn cancel(mut self) {
        self.fire();
    }

    fn fire(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.fire();
    }
}

impl std::fmt::Debug for TickHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TickHandle")
            .field("generation", &self.generation)
            .finish()
    }
}

#[cfg(test)]
pub mod manual {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records armed schedules instead of running timers. Tests fire ticks
    /// by calling the engine directly.
    #[derive(Clone, Default)]
    pub struct ManualScheduler {
        pub log: Arc<Mutex<ScheduleLog>>,
    }

    #[derive(Debug, Default)]
    pub struct ScheduleLog {
        pub armed: Vec<(u64, Duration)>,
        pub cancelled: Vec<u64>,
        pub gates: Vec<TickGate>,
    }

    impl ScheduleLog {
        pub fn active(&self) -> Vec<u64> {
            self.armed
                .iter()
                .map(|(generation, _)| *generation)
                .filter(|g| !self.cancelled.contains(g))
                .collect()
        }
    }

    impl Scheduler for ManualScheduler {
        fn schedule_repeating(&mut self, interval: Duration, generation: u64) -> TickHandle {
            let gate = TickGate::default();
            {
                let mut log = self.log.lock().unwrap();
                log.armed.push((generation, interval));
                log.gates.push(gate.clone());
            }
            let log = self.log.clone();
            TickHandle::new(generation, gate, move || {
                log.lock().unwrap().cancelled.push(generation);
            })
        }
    }
}
