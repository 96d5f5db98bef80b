//! Rectangular {date × ticker} price matrix.
//!
//! Construction joins per-ticker series on their common dates: a row is kept
//! only when every ticker has a finite close for that month. The matrix is
//! immutable once built.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::provider::MonthlyClose;

/// Monthly close prices, one column per ticker, dates ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceMatrix {
    dates: Vec<NaiveDate>,
    tickers: Vec<String>,
    /// `columns[t][i]` is the close of `tickers[t]` on `dates[i]`.
    columns: Vec<Vec<f64>>,
}

impl PriceMatrix {
    /// Build from already aligned columns. Rows containing a non-finite value
    /// are dropped, and rows are sorted by date.
    pub fn new(dates: Vec<NaiveDate>, tickers: Vec<String>, columns: Vec<Vec<f64>>) -> Self {
        let mut rows: Vec<usize> = (0..dates.len())
            .filter(|&i| {
                columns
                    .iter()
                    .all(|col| col.get(i).is_some_and(|v| v.is_finite()))
            })
            .collect();
        rows.sort_by_key(|&i| dates[i]);

        Self {
            dates: rows.iter().map(|&i| dates[i]).collect(),
            columns: columns
                .iter()
                .map(|col| rows.iter().map(|&i| col[i]).collect())
                .collect(),
            tickers,
        }
    }

    /// Inner-join per-ticker series on date, preserving `tickers` order.
    pub fn from_series(tickers: &[String], series: &BTreeMap<String, Vec<MonthlyClose>>) -> Self {
        let mut common: Option<BTreeSet<NaiveDate>> = None;
        for ticker in tickers {
            let dates: BTreeSet<NaiveDate> = series
                .get(ticker)
                .map(|s| {
                    s.iter()
                        .filter(|c| c.close.is_finite())
                        .map(|c| c.date)
                        .collect()
                })
                .unwrap_or_default();
            common = Some(match common {
                None => dates,
                Some(acc) => acc.intersection(&dates).copied().collect(),
            });
        }
        let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();

        let columns = tickers
            .iter()
            .map(|ticker| {
                let lookup: BTreeMap<NaiveDate, f64> = series
                    .get(ticker)
                    .map(|s| s.iter().map(|c| (c.date, c.close)).collect())
                    .unwrap_or_default();
                dates
                    .iter()
                    .map(|d| lookup.get(d).copied().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect();

        Self::new(dates, tickers.to_vec(), columns)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Number of rows (months).
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Close series for a ticker.
    pub fn series(&self, ticker: &str) -> Option<&[f64]> {
        self.tickers
            .iter()
            .position(|t| t == ticker)
            .map(|i| self.columns[i].as_slice())
    }

    /// Iterate `(ticker, series)` in column order.
    pub fn iter_series(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.tickers
            .iter()
            .zip(&self.columns)
            .map(|(t, c)| (t.as_str(), c.as_slice()))
    }

    /// Row `i` across all tickers.
    pub fn row(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c[i]).collect()
    }

    /// Monthly simple returns per ticker: `p_t / p_{t-1} - 1`.
    ///
    /// Returned column-major, each column one element shorter than the matrix.
    pub fn pct_returns(&self) -> Vec<Vec<f64>> {
        self.columns
            .iter()
            .map(|col| col.windows(2).map(|w| w[1] / w[0] - 1.0).collect())
            .collect()
    }

    /// Whether every ticker in `required` has a column.
    pub fn covers(&self, required: &[String]) -> bool {
        required.iter().all(|t| self.tickers.contains(t))
    }

    /// Columns for `tickers` in the given order. `None` if any is absent.
    pub fn select(&self, tickers: &[String]) -> Option<PriceMatrix> {
        let columns = tickers
            .iter()
            .map(|t| self.series(t).map(<[f64]>::to_vec))
            .collect::<Option<Vec<_>>>()?;
        Some(PriceMatrix {
            dates: self.dates.clone(),
            tickers: tickers.to_vec(),
            columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, 1).unwrap()
    }

    fn closes(points: &[(u32, f64)]) -> Vec<MonthlyClose> {
        points
            .iter()
            .map(|&(m, close)| MonthlyClose { date: d(m), close })
            .collect()
    }

    #[test]
    fn inner_join_keeps_common_months() {
        let tickers = vec!["A".to_string(), "B".to_string()];
        let mut series = BTreeMap::new();
        series.insert("A".into(), closes(&[(1, 10.0), (2, 11.0), (3, 12.0)]));
        series.insert("B".into(), closes(&[(2, 20.0), (3, 21.0), (4, 22.0)]));

        let m = PriceMatrix::from_series(&tickers, &series);
        assert_eq!(m.dates(), &[d(2), d(3)]);
        assert_eq!(m.series("A").unwrap(), &[11.0, 12.0]);
        assert_eq!(m.series("B").unwrap(), &[20.0, 21.0]);
    }

    #[test]
    fn rows_with_nan_are_dropped() {
        let m = PriceMatrix::new(
            vec![d(1), d(2), d(3)],
            vec!["A".into()],
            vec![vec![1.0, f64::NAN, 3.0]],
        );
        assert_eq!(m.len(), 2);
        assert_eq!(m.series("A").unwrap(), &[1.0, 3.0]);
    }

    #[test]
    fn pct_returns_per_column() {
        let m = PriceMatrix::new(
            vec![d(1), d(2), d(3)],
            vec!["A".into()],
            vec![vec![100.0, 110.0, 99.0]],
        );
        let r = m.pct_returns();
        assert!((r[0][0] - 0.10).abs() < 1e-12);
        assert!((r[0][1] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn select_reorders_and_rejects_missing() {
        let m = PriceMatrix::new(
            vec![d(1), d(2)],
            vec!["A".into(), "B".into()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        );
        let picked = m.select(&["B".to_string()]).unwrap();
        assert_eq!(picked.tickers(), &["B".to_string()]);
        assert_eq!(picked.series("B").unwrap(), &[3.0, 4.0]);
        assert!(m.select(&["C".to_string()]).is_none());
    }

    #[test]
    fn missing_ticker_yields_empty_matrix() {
        let tickers = vec!["A".to_string(), "Z".to_string()];
        let mut series = BTreeMap::new();
        series.insert("A".into(), closes(&[(1, 10.0)]));
        let m = PriceMatrix::from_series(&tickers, &series);
        assert!(m.is_empty());
    }
}
