// Frame resolution - the active sample set at a timeline position
use crate::domain::sample::Sample;
use crate::domain::series::SeriesIndex;
use crate::domain::tier::{Tier, TierBoundaries, TierCounts, TierFilter};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entity's latest sample at the frame time, with the path walked so far.
#[derive(Debug, Clone, Copy)]
pub struct ActiveEntry<'a> {
    pub sample: &'a Sample,
    pub tier: Tier,
    /// Every sample of the series up to and including `sample`.
    pub prefix: &'a [Sample],
}

/// Active entries in entity-id order.
#[derive(Debug, Clone)]
pub struct ActiveSet<'a> {
    pub time: DateTime<Utc>,
    pub entries: Vec<ActiveEntry<'a>>,
}

impl<'a> ActiveSet<'a> {
    #[cfg(test)]
    pub fn get(&self, entity_id: &str) -> Option<&ActiveEntry<'a>> {
        self.entries.iter().find(|e| e.sample.entity_id == entity_id)
    }

    pub fn counts(&self) -> TierCounts {
        TierCounts::tally(self.entries.iter().map(|e| e.tier))
    }

    pub fn visible<'s>(
        &'s self,
        filter: &'s TierFilter,
    ) -> impl Iterator<Item = &'s ActiveEntry<'a>> + 's {
        self.entries.iter().filter(move |e| filter.allows(e.tier))
    }
}

/// Compute the active set at `position`. Positions past the end are clamped
/// to the last instant.
pub fn resolve<'a>(
    index: &'a SeriesIndex,
    position: usize,
    boundaries: &TierBoundaries,
) -> ActiveSet<'a> {
    let timeline = index.timeline();
    let time = timeline
        .get(position)
        .unwrap_or_else(|| timeline.last());

    let entries = index
        .series()
        .filter_map(|series| {
            let prefix = series.prefix_at(time);
            prefix.last().map(|sample| ActiveEntry {
                sample,
                tier: boundaries.classify(sample.metric),
                prefix,
            })
        })
        .collect();

    ActiveSet { time, entries }
}

/// An entity as handed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibleEntity {
    pub entity_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub metric: f64,
    pub tier: Tier,
    pub path: Vec<[f64; 2]>,
}

impl VisibleEntity {
    pub fn from_entry(entry: &ActiveEntry<'_>) -> Self {
        Self {
            entity_id: entry.sample.entity_id.clone(),
            latitude: entry.sample.latitude,
            longitude: entry.sample.longitude,
            metric: entry.sample.metric,
            tier: entry.tier,
            path: entry
                .prefix
                .iter()
                .map(|s| [s.latitude, s.longitude])
                .collect(),
        }
    }
}

/// Owned per-frame output for the render collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameView {
    pub position: usize,
    pub length: usize,
    pub playing: bool,
    pub time: DateTime<Utc>,
    pub time_label: String,
    pub progress_percent: u8,
    pub counts: TierCounts,
    pub visible: Vec<VisibleEntity>,
}

/// `dd/mm/yyyy HH:MM:SS UTC`
pub fn format_time_label(time: DateTime<Utc>) -> String {
    time.format("%d/%m/%Y %H:%M:%S UTC").to_string()
}
