//! Flat-file price matrix cache.
//!
//! Layout: a single CSV with a `Date` column followed by one column per
//! ticker. The cache is never invalidated automatically; deleting the file is
//! the only way to force a fresh retrieval.

use chrono::NaiveDate;
use std::fs;
use std::path::{Path, PathBuf};

use super::matrix::PriceMatrix;
use super::provider::DataError;

const DATE_COLUMN: &str = "Date";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Price matrix cache backed by one CSV file.
#[derive(Debug, Clone)]
pub struct PriceCache {
    path: PathBuf,
}

impl PriceCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the cached matrix.
    pub fn load(&self) -> Result<PriceMatrix, DataError> {
        read_matrix_csv(&self.path)
    }

    /// Write the matrix, replacing any previous cache atomically.
    pub fn write(&self, matrix: &PriceMatrix) -> Result<(), DataError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("csv.tmp");
        write_matrix_csv(&tmp, matrix)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Delete the cache file. Returns whether a file was removed.
    pub fn clear(&self) -> Result<bool, DataError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DataError::Io(e)),
        }
    }
}

/// Write a matrix as `Date,<ticker>...` CSV.
pub fn write_matrix_csv(path: &Path, matrix: &PriceMatrix) -> Result<(), DataError> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(matrix.tickers().iter().cloned());
    wtr.write_record(&header)?;

    for (i, date) in matrix.dates().iter().enumerate() {
        let mut record = vec![date.format(DATE_FORMAT).to_string()];
        record.extend(matrix.row(i).iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a `Date,<ticker>...` CSV into a matrix.
///
/// Empty or unparseable cells become NaN and their rows are dropped by the
/// matrix constructor.
pub fn read_matrix_csv(path: &Path) -> Result<PriceMatrix, DataError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    let date_idx = headers
        .iter()
        .position(|h| h == DATE_COLUMN || h.is_empty())
        .ok_or_else(|| DataError::CacheError(format!("{}: no Date column", path.display())))?;

    let ticker_idx: Vec<usize> = (0..headers.len()).filter(|&i| i != date_idx).collect();
    let tickers: Vec<String> = ticker_idx.iter().map(|&i| headers[i].to_string()).collect();

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); tickers.len()];
    for record in rdr.records() {
        let record = record?;
        let raw_date = record.get(date_idx).unwrap_or_default();
        // tolerate timestamps such as "2024-01-01 00:00:00"
        let date = NaiveDate::parse_from_str(raw_date.get(..10).unwrap_or(raw_date), DATE_FORMAT)
            .map_err(|e| DataError::CacheError(format!("bad date '{raw_date}': {e}")))?;
        dates.push(date);
        for (col, &i) in columns.iter_mut().zip(&ticker_idx) {
            let value = record
                .get(i)
                .and_then(|s| s.trim().parse::<f64>().ok())
                .unwrap_or(f64::NAN);
            col.push(value);
        }
    }

    Ok(PriceMatrix::new(dates, tickers, columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PriceMatrix {
        let dates = (1..=3)
            .map(|m| NaiveDate::from_ymd_opt(2024, m, 1).unwrap())
            .collect();
        PriceMatrix::new(
            dates,
            vec!["AAPL".into(), "MSFT".into()],
            vec![vec![150.0, 151.5, 149.25], vec![280.0, 282.0, 290.125]],
        )
    }

    #[test]
    fn write_then_load_preserves_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("financial_data.csv"));
        assert!(!cache.exists());

        cache.write(&sample()).unwrap();
        assert!(cache.exists());
        assert_eq!(cache.load().unwrap(), sample());
    }

    #[test]
    fn clear_removes_file_once() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        cache.write(&sample()).unwrap();
        assert!(cache.clear().unwrap());
        assert!(!cache.clear().unwrap());
    }

    #[test]
    fn blank_cells_drop_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.csv");
        fs::write(&path, "Date,A\n2024-01-01,1.0\n2024-02-01,\n2024-03-01 00:00:00,3.0\n").unwrap();
        let m = read_matrix_csv(&path).unwrap();
        assert_eq!(m.len(), 2);
        assert_eq!(m.series("A").unwrap(), &[1.0, 3.0]);
    }
}
