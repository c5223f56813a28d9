// Synthetic fallback data
use crate::domain::sample::RawRow;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const SATELLITES: [&str; 5] = ["G01", "G02", "G03", "G04", "G05"];
const STEPS: i64 = 20;

/// Five satellites drifting over 20 one-minute steps ending at `end`.
pub fn mock_rows(end: DateTime<Utc>, seed: u64) -> Vec<RawRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let times: Vec<String> = (0..STEPS)
        .map(|i| (end - Duration::minutes(STEPS - i)).to_rfc3339_opts(SecondsFormat::Secs, true))
        .collect();

    let mut rows = Vec::with_capacity(SATELLITES.len() * times.len());
    for satellite in SATELLITES {
        let base_lat = rng.gen_range(10.0..20.0);
        let base_lon = rng.gen_range(95.0..105.0);

        for (i, time) in times.iter().enumerate() {
            let drift_lat = (i as f64 / times.len() as f64) * 2.0 - 1.0;
            let drift_lon = (i as f64 / 3.0).sin();
            let metric = rng.gen_range(0.1..0.5);
            rows.push(RawRow::new(
                satellite,
                time,
                base_lat + drift_lat,
                base_lon + drift_lon,
                metric,
            ));
        }
    }

    tracing::info!(
        satellites = SATELLITES.len(),
        timestamps = times.len(),
        "generated mock samples"
    );
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::parse_batch;
    use crate::domain::series::SeriesIndex;
    use chrono::TimeZone;

    #[test]
    fn test_mock_rows_build_an_index() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let batch = parse_batch(mock_rows(end, 7));
        assert!(batch.rejected.is_empty());
        assert!(batch.samples.iter().all(|s| (0.1..0.5).contains(&s.metric)));

        let index = SeriesIndex::build(batch.samples).unwrap();
        assert_eq!(index.entity_count(), 5);
        assert_eq!(index.timeline().len(), 20);
        assert_eq!(index.timeline().last(), end - Duration::minutes(1));
    }

    #[test]
    fn test_mock_rows_are_reproducible() {
        let end = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let a: Vec<Option<String>> = mock_rows(end, 1).into_iter().map(|r| r.metric).collect();
        let b: Vec<Option<String>> = mock_rows(end, 1).into_iter().map(|r| r.metric).collect();
        assert_eq!(a, b);
    }
}
