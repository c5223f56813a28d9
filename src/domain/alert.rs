// Critical-entity alerting and enrichment bookkeeping
use crate::domain::frame::ActiveSet;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticalEntity {
    pub entity_id: String,
    pub time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub metric: f64,
    /// Resolved place name, filled in once enrichment completes.
    pub place: Option<String>,
}

impl CriticalEntity {
    fn key(&self) -> LookupKey {
        LookupKey {
            entity_id: self.entity_id.clone(),
            time: self.time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertState {
    pub critical: Vec<CriticalEntity>,
}

impl AlertState {
    pub fn is_empty(&self) -> bool {
        self.critical.is_empty()
    }
}

/// Identifies the sample a lookup was issued for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LookupKey {
    pub entity_id: String,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub key: LookupKey,
    pub latitude: f64,
    pub longitude: f64,
    /// Delay before the lookup may be sent.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentResult {
    pub key: LookupKey,
    pub place: String,
}

#[derive(Debug, Default)]
pub struct AlertOutcome {
    /// Present when the alert state must be republished.
    pub update: Option<AlertState>,
    pub lookups: Vec<LookupRequest>,
}

pub struct AlertTracker {
    threshold: f64,
    delay_step: Duration,
    state: AlertState,
    in_flight: HashSet<LookupKey>,
}

impl AlertTracker {
    pub fn new(threshold: f64, delay_step: Duration) -> Self {
        Self {
            threshold,
            delay_step,
            state: AlertState::default(),
            in_flight: HashSet::new(),
        }
    }

    pub fn state(&self) -> &AlertState {
        &self.state
    }

    /// Recompute the critical set from a frame.
    ///
    /// Nothing is emitted while there is nothing to show and nothing to clear.
    /// Entries keep a resolved place while they still refer to the same
    /// sample; new samples without a lookup in flight get one, staggered by
    /// `delay_step` within this frame.
    pub fn observe(&mut self, active: &ActiveSet<'_>) -> AlertOutcome {
        let critical: Vec<CriticalEntity> = active
            .entries
            .iter()
            .filter(|e| e.sample.metric > self.threshold)
            .map(|e| {
                let sample = e.sample;
                let place = self
                    .state
                    .critical
                    .iter()
                    .find(|c| c.entity_id == sample.entity_id && c.time == sample.timestamp)
                    .and_then(|c| c.place.clone());
                CriticalEntity {
                    entity_id: sample.entity_id.clone(),
                    time: sample.timestamp,
                    latitude: sample.latitude,
                    longitude: sample.longitude,
                    metric: sample.metric,
                    place,
                }
            })
            .collect();

        if critical.is_empty() && self.state.is_empty() {
            return AlertOutcome::default();
        }

        match (self.state.is_empty(), critical.is_empty()) {
            (true, false) => tracing::info!(count = critical.len(), time = %active.time, "critical alerts raised"),
            (false, true) => tracing::info!(time = %active.time, "critical alerts cleared"),
            _ => {}
        }

        let mut lookups = Vec::new();
        for entity in critical.iter().filter(|c| c.place.is_none()) {
            let key = entity.key();
            if self.in_flight.insert(key.clone()) {
                let delay = self.delay_step * lookups.len() as u32;
                lookups.push(LookupRequest {
                    key,
                    latitude: entity.latitude,
                    longitude: entity.longitude,
                    delay,
                });
            }
        }

        self.state = AlertState { critical };
        AlertOutcome {
            update: Some(self.state.clone()),
            lookups,
        }
    }

    /// Write a completed lookup into its slot. Returns the updated state, or
    /// `None` when the entity is no longer critical for that sample.
    pub fn apply(&mut self, result: EnrichmentResult) -> Option<AlertState> {
        self.in_flight.remove(&result.key);

        let Some(slot) = self
            .state
            .critical
            .iter_mut()
            .find(|c| c.entity_id == result.key.entity_id && c.time == result.key.time)
        else {
            tracing::debug!(
                entity = %result.key.entity_id,
                time = %result.key.time,
                "discarding stale lookup"
            );
            return None;
        };

        slot.place = Some(result.place);
        Some(self.state.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::frame::resolve;
    use crate::domain::sample::Sample;
    use crate::domain::series::SeriesIndex;
    use crate::domain::tier::TierBoundaries;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap()
    }

    fn sample(id: &str, minute: u32, metric: f64) -> Sample {
        Sample {
            entity_id: id.to_string(),
            timestamp: at(minute),
            latitude: 13.0,
            longitude: 100.0,
            metric,
        }
    }

    fn index() -> SeriesIndex {
        SeriesIndex::build(vec![
            sample("A", 0, 0.1),
            sample("B", 0, 0.2),
            sample("A", 1, 0.45),
            sample("B", 2, 0.5),
            sample("A", 3, 0.1),
            sample("B", 3, 0.1),
        ])
        .unwrap()
    }

    fn tracker() -> AlertTracker {
        AlertTracker::new(0.40, Duration::from_millis(300))
    }

    #[test]
    fn test_no_update_while_nothing_to_show() {
        let index = index();
        let mut tracker = tracker();
        let outcome = tracker.observe(&resolve(&index, 0, &TierBoundaries::default()));
        assert!(outcome.update.is_none());
        assert!(outcome.lookups.is_empty());
    }

    #[test]
    fn test_raise_and_clear() {
        let index = index();
        let boundaries = TierBoundaries::default();
        let mut tracker = tracker();

        let raised = tracker.observe(&resolve(&index, 1, &boundaries));
        let state = raised.update.unwrap();
        assert_eq!(state.critical.len(), 1);
        assert_eq!(state.critical[0].entity_id, "A");
        assert_eq!(raised.lookups.len(), 1);
        assert_eq!(raised.lookups[0].delay, Duration::ZERO);

        let cleared = tracker.observe(&resolve(&index, 3, &boundaries));
        assert_eq!(cleared.update, Some(AlertState::default()));

        let quiet = tracker.observe(&resolve(&index, 3, &boundaries));
        assert!(quiet.update.is_none());
    }

    #[test]
    fn test_lookups_staggered_and_not_repeated() {
        let index = index();
        let boundaries = TierBoundaries::default();
        let mut tracker = AlertTracker::new(0.15, Duration::from_millis(300));

        let first = tracker.observe(&resolve(&index, 0, &boundaries));
        let delays: Vec<Duration> = first.lookups.iter().map(|l| l.delay).collect();
        assert_eq!(delays, vec![Duration::ZERO]);
        assert_eq!(first.lookups[0].key.entity_id, "B");

        let second = tracker.observe(&resolve(&index, 2, &boundaries));
        let delays: Vec<Duration> = second.lookups.iter().map(|l| l.delay).collect();
        assert_eq!(delays, vec![Duration::ZERO, Duration::from_millis(300)]);

        // same samples again: lookups already in flight
        let third = tracker.observe(&resolve(&index, 2, &boundaries));
        assert!(third.update.is_some());
        assert!(third.lookups.is_empty());
    }

    #[test]
    fn test_apply_and_carry_over() {
        let index = index();
        let boundaries = TierBoundaries::default();
        let mut tracker = tracker();

        let outcome = tracker.observe(&resolve(&index, 1, &boundaries));
        let key = outcome.lookups[0].key.clone();
        let state = tracker
            .apply(EnrichmentResult {
                key,
                place: "Bangkok".to_string(),
            })
            .unwrap();
        assert_eq!(state.critical[0].place.as_deref(), Some("Bangkok"));

        // A is still on the same sample at position 2, B has joined
        let outcome = tracker.observe(&resolve(&index, 2, &boundaries));
        let state = outcome.update.unwrap();
        assert_eq!(state.critical[0].place.as_deref(), Some("Bangkok"));
        assert_eq!(state.critical[1].place, None);
        assert_eq!(outcome.lookups.len(), 1);
        assert_eq!(outcome.lookups[0].key.entity_id, "B");
    }

    #[test]
    fn test_stale_lookup_is_discarded() {
        let index = index();
        let boundaries = TierBoundaries::default();
        let mut tracker = tracker();

        let outcome = tracker.observe(&resolve(&index, 1, &boundaries));
        let key = outcome.lookups[0].key.clone();
        tracker.observe(&resolve(&index, 3, &boundaries));

        assert!(tracker
            .apply(EnrichmentResult {
                key,
                place: "Bangkok".to_string(),
            })
            .is_none());
        assert!(tracker.state().is_empty());
    }
}
