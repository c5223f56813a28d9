// Per-entity time series and the global playback timeline
use crate::domain::error::EngineError;
use crate::domain::sample::Sample;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Samples of one entity, ordered by timestamp.
#[derive(Debug, Clone)]
pub struct Series {
    entity_id: String,
    samples: Vec<Sample>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub points: usize,
    pub first_time: DateTime<Utc>,
    pub last_time: DateTime<Utc>,
    pub min_metric: f64,
    pub max_metric: f64,
}

impl Series {
    fn new(entity_id: String, mut samples: Vec<Sample>) -> Self {
        // sort_by_key is stable: equal timestamps keep input order
        samples.sort_by_key(|s| s.timestamp);
        Self { entity_id, samples }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Number of samples with `timestamp <= at`.
    pub fn count_at_or_before(&self, at: DateTime<Utc>) -> usize {
        self.samples.partition_point(|s| s.timestamp <= at)
    }

    /// Samples with `timestamp <= at`, as a borrowed prefix.
    pub fn prefix_at(&self, at: DateTime<Utc>) -> &[Sample] {
        &self.samples[..self.count_at_or_before(at)]
    }

    pub fn summary(&self) -> SeriesSummary {
        let (min_metric, max_metric) = self
            .samples
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
                (lo.min(s.metric), hi.max(s.metric))
            });

        SeriesSummary {
            points: self.samples.len(),
            first_time: self.samples[0].timestamp,
            last_time: self.samples[self.samples.len() - 1].timestamp,
            min_metric,
            max_metric,
        }
    }
}

/// Sorted, duplicate-free timestamps across every series.
#[derive(Debug, Clone)]
pub struct Timeline {
    instants: Vec<DateTime<Utc>>,
}

impl Timeline {
    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn get(&self, position: usize) -> Option<DateTime<Utc>> {
        self.instants.get(position).copied()
    }

    pub fn first(&self) -> DateTime<Utc> {
        self.instants[0]
    }

    pub fn last(&self) -> DateTime<Utc> {
        self.instants[self.instants.len() - 1]
    }

    #[cfg(test)]
    pub fn instants(&self) -> &[DateTime<Utc>] {
        &self.instants
    }
}

/// Owns every series and the timeline derived from them.
///
/// Built once from a non-empty batch, so `Timeline` always has at least one
/// instant and every `Series` at least one sample.
#[derive(Debug, Clone)]
pub struct SeriesIndex {
    series: BTreeMap<String, Series>,
    timeline: Timeline,
}

impl SeriesIndex {
    pub fn build(samples: Vec<Sample>) -> Result<Self, EngineError> {
        if samples.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let mut instants: Vec<DateTime<Utc>> = samples.iter().map(|s| s.timestamp).collect();
        instants.sort_unstable();
        instants.dedup();

        let mut groups: BTreeMap<String, Vec<Sample>> = BTreeMap::new();
        for sample in samples {
            groups.entry(sample.entity_id.clone()).or_default().push(sample);
        }

        let series = groups
            .into_iter()
            .map(|(id, samples)| (id.clone(), Series::new(id, samples)))
            .collect::<BTreeMap<_, _>>();

        tracing::info!(
            entities = series.len(),
            timestamps = instants.len(),
            "built series index"
        );

        Ok(Self {
            series,
            timeline: Timeline { instants },
        })
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Series in entity-id order.
    pub fn series(&self) -> impl Iterator<Item = &Series> {
        self.series.values()
    }

    #[cfg(test)]
    pub fn get(&self, entity_id: &str) -> Option<&Series> {
        self.series.get(entity_id)
    }

    pub fn entity_count(&self) -> usize {
        self.series.len()
    }
}
