//! Retrieval with synthetic fallback.
//!
//! Retrieval is all-or-nothing: if any ticker fails, or the joined matrix is
//! shorter than `min_rows`, the whole ticker set is synthesized instead.
//! Failures are reported through the returned `Acquisition`, never raised.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use super::calendar::sub_months;
use super::matrix::PriceMatrix;
use super::provider::{DataError, PriceProvider};
use super::synthetic::synthetic_matrix;
use crate::diagnostics::Diagnostic;
use crate::rng::RngHierarchy;

/// Minimum joined rows for a retrieval to be accepted.
pub const MIN_RETRIEVED_ROWS: usize = 10;

/// What to acquire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionRequest {
    pub tickers: Vec<String>,
    /// Last date of the history window.
    pub as_of: NaiveDate,
    pub history_years: u32,
    pub min_rows: usize,
    /// Master seed for the synthetic generator.
    pub seed: u64,
}

impl AcquisitionRequest {
    pub fn new(tickers: Vec<String>, as_of: NaiveDate) -> Self {
        Self {
            tickers,
            as_of,
            history_years: 5,
            min_rows: MIN_RETRIEVED_ROWS,
            seed: 42,
        }
    }

    pub fn start(&self) -> NaiveDate {
        sub_months(self.as_of, self.history_years * 12)
    }

    /// Months generated by the synthetic fallback.
    pub fn synthetic_periods(&self) -> usize {
        (self.history_years as usize * 12).max(1)
    }
}

/// Where the price matrix came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum Acquisition {
    Retrieved(PriceMatrix),
    Synthesized { matrix: PriceMatrix, reason: String },
}

impl Acquisition {
    pub fn matrix(&self) -> &PriceMatrix {
        match self {
            Acquisition::Retrieved(m) => m,
            Acquisition::Synthesized { matrix, .. } => matrix,
        }
    }

    pub fn into_matrix(self) -> PriceMatrix {
        match self {
            Acquisition::Retrieved(m) => m,
            Acquisition::Synthesized { matrix, .. } => matrix,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Acquisition::Synthesized { .. })
    }

    /// Short label for summaries: `retrieved` or `synthetic`.
    pub fn origin(&self) -> &'static str {
        match self {
            Acquisition::Retrieved(_) => "retrieved",
            Acquisition::Synthesized { .. } => "synthetic",
        }
    }

    /// Diagnostic describing the outcome.
    pub fn diagnostic(&self) -> Diagnostic {
        let m = self.matrix();
        match self {
            Acquisition::Retrieved(_) => Diagnostic::ok(format!(
                "Retrieved {} tickers, {} monthly rows",
                m.tickers().len(),
                m.len()
            )),
            Acquisition::Synthesized { reason, .. } => Diagnostic::warn(format!(
                "Retrieval failed ({reason}); using synthetic data: {} tickers, {} monthly rows",
                m.tickers().len(),
                m.len()
            )),
        }
    }
}

/// Retrieve every ticker through `provider` and join them on date.
pub fn retrieve_all(
    provider: &dyn PriceProvider,
    request: &AcquisitionRequest,
) -> Result<PriceMatrix, DataError> {
    let start = request.start();
    let mut series = BTreeMap::new();
    for ticker in &request.tickers {
        let closes = provider.fetch_monthly(ticker, start, request.as_of)?;
        series.insert(ticker.clone(), closes);
    }

    let matrix = PriceMatrix::from_series(&request.tickers, &series);
    if matrix.len() < request.min_rows {
        return Err(DataError::InsufficientRows {
            rows: matrix.len(),
            min_rows: request.min_rows,
        });
    }
    Ok(matrix)
}

/// Acquire prices, falling back to synthetic data on any retrieval failure.
///
/// `provider = None` means offline mode and always synthesizes.
pub fn acquire_prices(
    provider: Option<&dyn PriceProvider>,
    request: &AcquisitionRequest,
) -> Acquisition {
    let reason = match provider {
        None => "offline mode".to_string(),
        Some(p) => match retrieve_all(p, request) {
            Ok(matrix) => {
                info!(
                    provider = p.name(),
                    tickers = request.tickers.len(),
                    rows = matrix.len(),
                    "price retrieval succeeded"
                );
                return Acquisition::Retrieved(matrix);
            }
            Err(e) => {
                warn!(provider = p.name(), error = %e, "price retrieval failed, synthesizing");
                e.to_string()
            }
        },
    };

    let rng = RngHierarchy::new(request.seed);
    let matrix = synthetic_matrix(
        &request.tickers,
        request.synthetic_periods(),
        request.as_of,
        &rng,
    );
    Acquisition::Synthesized { matrix, reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::calendar::months_ending;
    use crate::data::provider::MonthlyClose;

    struct FixedProvider {
        months: usize,
        fail_on: Option<&'static str>,
    }

    impl PriceProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        fn fetch_monthly(
            &self,
            ticker: &str,
            _start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<MonthlyClose>, DataError> {
            if self.fail_on == Some(ticker) {
                return Err(DataError::NetworkUnreachable("connection refused".into()));
            }
            Ok(months_ending(end, self.months)
                .into_iter()
                .enumerate()
                .map(|(i, date)| MonthlyClose {
                    date,
                    close: 100.0 + i as f64,
                })
                .collect())
        }
    }

    fn request() -> AcquisitionRequest {
        AcquisitionRequest::new(
            vec!["AAPL".into(), "MSFT".into()],
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
        )
    }

    #[test]
    fn successful_retrieval_is_used() {
        let provider = FixedProvider {
            months: 24,
            fail_on: None,
        };
        let acq = acquire_prices(Some(&provider), &request());
        assert!(!acq.is_synthetic());
        assert_eq!(acq.matrix().len(), 24);
        assert_eq!(acq.matrix().series("AAPL").unwrap()[0], 100.0);
    }

    #[test]
    fn single_ticker_failure_synthesizes_all() {
        let provider = FixedProvider {
            months: 24,
            fail_on: Some("MSFT"),
        };
        let acq = acquire_prices(Some(&provider), &request());
        assert!(acq.is_synthetic());
        assert_eq!(acq.matrix().len(), 60);
        assert!(acq.matrix().covers(&request().tickers));
        assert_eq!(acq.diagnostic().severity, crate::diagnostics::Severity::Warn);
    }

    #[test]
    fn short_history_synthesizes() {
        let provider = FixedProvider {
            months: 9,
            fail_on: None,
        };
        match acquire_prices(Some(&provider), &request()) {
            Acquisition::Synthesized { reason, .. } => assert!(reason.contains("9 rows")),
            other => panic!("expected synthetic, got {}", other.origin()),
        }
    }

    #[test]
    fn offline_is_deterministic() {
        let a = acquire_prices(None, &request());
        let b = acquire_prices(None, &request());
        assert!(a.is_synthetic());
        assert_eq!(a, b);
    }
}
