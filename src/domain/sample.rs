// Sample domain model - validated measurement rows
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw, unvalidated row as produced by a row source.
///
/// Every field is optional text so that the source never has to decide what
/// a well-formed row looks like.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Satellite")]
    pub entity_id: Option<String>,
    #[serde(rename = "Time")]
    pub time: Option<String>,
    #[serde(rename = "Lat")]
    pub latitude: Option<String>,
    #[serde(rename = "Lon")]
    pub longitude: Option<String>,
    #[serde(rename = "S4C")]
    pub metric: Option<String>,
}

impl RawRow {
    pub fn new(entity_id: &str, time: &str, latitude: f64, longitude: f64, metric: f64) -> Self {
        Self {
            entity_id: Some(entity_id.to_string()),
            time: Some(time.to_string()),
            latitude: Some(latitude.to_string()),
            longitude: Some(longitude.to_string()),
            metric: Some(metric.to_string()),
        }
    }
}

/// One validated measurement for one entity at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub entity_id: String,
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub metric: f64,
}

/// Why a row was rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RejectReason {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("empty entity id")]
    EmptyEntityId,

    #[error("unparsable timestamp `{0}`")]
    BadTimestamp(String),

    #[error("field `{field}` is not a finite number: `{value}`")]
    BadNumber { field: &'static str, value: String },

    #[error("negative metric {0}")]
    NegativeMetric(f64),

    #[error("{field} {value} out of range")]
    OutOfRange { field: &'static str, value: f64 },
}

/// A rejected row together with its position in the batch (0-based).
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub row: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub samples: Vec<Sample>,
    pub rejected: Vec<Rejected>,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO-like instant. Naive date-times are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RejectReason> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RejectReason::MissingField(field)),
    }
}

fn finite(value: &str, field: &'static str) -> Result<f64, RejectReason> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RejectReason::BadNumber {
            field,
            value: value.to_string(),
        })
}

fn within(value: f64, bound: f64, field: &'static str) -> Result<f64, RejectReason> {
    if value.abs() <= bound {
        Ok(value)
    } else {
        Err(RejectReason::OutOfRange { field, value })
    }
}

/// Validate a single row.
pub fn parse_row(raw: &RawRow) -> Result<Sample, RejectReason> {
    let entity_id = match raw.entity_id.as_deref().map(str::trim) {
        None => return Err(RejectReason::MissingField("entity_id")),
        Some("") => return Err(RejectReason::EmptyEntityId),
        Some(id) => id.to_string(),
    };

    let time = required(&raw.time, "time")?;
    let timestamp =
        parse_timestamp(time).ok_or_else(|| RejectReason::BadTimestamp(time.to_string()))?;

    let latitude = within(finite(required(&raw.latitude, "latitude")?, "latitude")?, 90.0, "latitude")?;
    let longitude = within(
        finite(required(&raw.longitude, "longitude")?, "longitude")?,
        180.0,
        "longitude",
    )?;

    let metric = finite(required(&raw.metric, "metric")?, "metric")?;
    if metric < 0.0 {
        return Err(RejectReason::NegativeMetric(metric));
    }

    Ok(Sample {
        entity_id,
        timestamp,
        latitude,
        longitude,
        metric,
    })
}

/// Validate a whole batch, collecting rejects instead of stopping at the first.
pub fn parse_batch<I>(rows: I) -> ParsedBatch
where
    I: IntoIterator<Item = RawRow>,
{
    let mut batch = ParsedBatch::default();

    for (row, raw) in rows.into_iter().enumerate() {
        match parse_row(&raw) {
            Ok(sample) => batch.samples.push(sample),
            Err(reason) => {
                tracing::debug!(row, %reason, "dropping malformed row");
                batch.rejected.push(Rejected { row, reason });
            }
        }
    }

    if let Some(first) = batch.rejected.first() {
        tracing::warn!(
            accepted = batch.samples.len(),
            rejected = batch.rejected.len(),
            first_row = first.row,
            first_reason = %first.reason,
            "dropped malformed rows"
        );
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(id: &str, time: &str, lat: &str, lon: &str, metric: &str) -> RawRow {
        RawRow {
            entity_id: Some(id.to_string()),
            time: Some(time.to_string()),
            latitude: Some(lat.to_string()),
            longitude: Some(lon.to_string()),
            metric: Some(metric.to_string()),
        }
    }

    #[test]
    fn test_parse_valid_row() {
        let sample = parse_row(&row(" G07 ", "2024-03-01T12:00:00Z", "13.75", "100.5", "0.31")).unwrap();
        assert_eq!(sample.entity_id, "G07");
        assert_eq!(sample.timestamp, Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap());
        assert_eq!(sample.latitude, 13.75);
        assert_eq!(sample.metric, 0.31);
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-03-01T12:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T19:00:00+07:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_rejects() {
        let mut missing = row("G01", "2024-03-01 12:00:00", "1", "2", "0.1");
        missing.metric = None;
        assert_eq!(parse_row(&missing), Err(RejectReason::MissingField("metric")));

        assert_eq!(
            parse_row(&row("  ", "2024-03-01 12:00:00", "1", "2", "0.1")),
            Err(RejectReason::EmptyEntityId)
        );
        assert!(matches!(
            parse_row(&row("G01", "noon", "1", "2", "0.1")),
            Err(RejectReason::BadTimestamp(_))
        ));
        assert!(matches!(
            parse_row(&row("G01", "2024-03-01 12:00:00", "NaN", "2", "0.1")),
            Err(RejectReason::BadNumber { field: "latitude", .. })
        ));
        assert!(matches!(
            parse_row(&row("G01", "2024-03-01 12:00:00", "1", "inf", "0.1")),
            Err(RejectReason::BadNumber { field: "longitude", .. })
        ));
        assert_eq!(
            parse_row(&row("G01", "2024-03-01 12:00:00", "1", "2", "-0.1")),
            Err(RejectReason::NegativeMetric(-0.1))
        );
        assert!(matches!(
            parse_row(&row("G01", "2024-03-01 12:00:00", "91", "2", "0.1")),
            Err(RejectReason::OutOfRange { field: "latitude", .. })
        ));
    }

    #[test]
    fn test_parse_batch_keeps_going() {
        let rows = vec![
            row("G01", "2024-03-01 12:00:00", "1", "2", "0.1"),
            row("G01", "bad", "1", "2", "0.1"),
            row("G02", "2024-03-01 12:01:00", "1", "2", "0.2"),
        ];
        let batch = parse_batch(rows);
        assert_eq!(batch.samples.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.rejected[0].row, 1);
    }
}
