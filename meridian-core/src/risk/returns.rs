//! Empirical moments of monthly asset returns.

use serde::{Deserialize, Serialize};

use super::RiskError;
use crate::data::PriceMatrix;
use crate::stats::correlation::correlation_matrix;
use crate::stats::mean;

/// Mean vector, sample covariance and correlation of monthly returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub tickers: Vec<String>,
    pub mean: Vec<f64>,
    /// Sample covariance (ddof = 1).
    pub covariance: Vec<Vec<f64>>,
    /// Pearson correlation; NaN where an asset has zero variance.
    pub correlation: Vec<Vec<f64>>,
    /// Number of return rows used.
    pub observations: usize,
}

impl ReturnStatistics {
    /// Estimate from a price matrix's month-over-month percentage returns.
    pub fn from_prices(matrix: &PriceMatrix) -> Result<Self, RiskError> {
        if matrix.tickers().is_empty() {
            return Err(RiskError::NoAssets);
        }
        let returns = matrix.pct_returns();
        let observations = returns.first().map(Vec::len).unwrap_or(0);
        if observations < 2 {
            return Err(RiskError::InsufficientHistory {
                returns: observations,
            });
        }
        if returns.iter().flatten().any(|r| !r.is_finite()) {
            return Err(RiskError::NonFiniteReturns);
        }
        Ok(Self {
            tickers: matrix.tickers().to_vec(),
            mean: returns.iter().map(|col| mean(col)).collect(),
            covariance: covariance(&returns),
            correlation: correlation_matrix(&returns),
            observations,
        })
    }

    pub fn n_assets(&self) -> usize {
        self.tickers.len()
    }
}

/// Sample covariance of equally long columns.
pub fn covariance(columns: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let k = columns.len();
    let n = columns.first().map(Vec::len).unwrap_or(0);
    let means: Vec<f64> = columns.iter().map(|c| mean(c)).collect();
    let mut cov = vec![vec![0.0; k]; k];
    if n < 2 {
        return cov;
    }
    for i in 0..k {
        for j in 0..=i {
            let s: f64 = columns[i]
                .iter()
                .zip(&columns[j])
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum();
            cov[i][j] = s / (n - 1) as f64;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}
