// CSV row source
use crate::domain::sample::RawRow;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;

/// Read every data row. Records that cannot be decoded become empty rows so
/// the sample parser rejects them with the rest of the batch.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (line, record) in reader.deserialize::<RawRow>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(e).context("Failed to read CSV data"),
            Err(e) => {
                tracing::debug!(line, error = %e, "undecodable CSV record");
                rows.push(RawRow::default());
            }
        }
    }

    Ok(rows)
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let rows = read_rows(file)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded CSV rows");
    Ok(rows)
}
