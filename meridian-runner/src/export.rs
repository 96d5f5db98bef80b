//! CSV and JSON writers for pipeline outputs.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

use meridian_core::data::cache::write_matrix_csv;
use meridian_core::data::PriceMatrix;

/// Create `dir` and its parents.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create directory {}", dir.display()))
}

/// Write serializable records as CSV under an explicit header row.
///
/// `headers` must list the record fields in declaration order. An empty
/// slice still produces a file with the header.
pub fn write_records<T: Serialize>(
    path: &Path,
    headers: &[&str],
    records: &[T],
) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(headers)
        .with_context(|| format!("write header to {}", path.display()))?;
    for record in records {
        wtr.serialize(record)
            .with_context(|| format!("write record to {}", path.display()))?;
    }
    wtr.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Delete an output left by an earlier run. Returns whether a file existed.
pub fn remove_stale(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e).with_context(|| format!("remove stale {}", path.display())),
    }
}

/// Write a header row and string rows.
pub fn write_table<I>(path: &Path, headers: &[String], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("create {}", path.display()))?;
    wtr.write_record(headers)
        .with_context(|| format!("write header to {}", path.display()))?;
    for row in rows {
        wtr.write_record(&row)
            .with_context(|| format!("write row to {}", path.display()))?;
    }
    wtr.flush().with_context(|| format!("flush {}", path.display()))?;
    Ok(())
}

/// Write a price matrix as `Date,<ticker>...`.
pub fn write_prices(path: &Path, matrix: &PriceMatrix) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    write_matrix_csv(path, matrix).with_context(|| format!("write prices to {}", path.display()))
}

/// Write pretty-printed JSON.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(value).context("serialize summary")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}
