//! Portfolio risk simulation: return moments, correlated Monte Carlo,
//! VaR/CVaR metrics.

pub mod metrics;
pub mod returns;
pub mod simulator;

pub use metrics::RiskMetrics;
pub use returns::{covariance, ReturnStatistics};
pub use simulator::{simulate_portfolio, MonteCarloConfig, SimulationResult, TrajectoryOutcome};

use thiserror::Error;

use crate::data::PriceMatrix;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    #[error("no assets to simulate")]
    NoAssets,

    #[error("insufficient history: {returns} return rows, need at least 2")]
    InsufficientHistory { returns: usize },

    #[error("returns contain non-finite values")]
    NonFiniteReturns,

    #[error("covariance matrix is not positive definite even with jitter")]
    CovarianceNotPositiveDefinite,

    #[error("invalid simulation config: {0}")]
    InvalidConfig(String),
}

/// Estimate return moments from prices and simulate.
pub fn run_monte_carlo(
    matrix: &PriceMatrix,
    config: &MonteCarloConfig,
) -> Result<(ReturnStatistics, SimulationResult), RiskError> {
    let stats = ReturnStatistics::from_prices(matrix)?;
    let result = simulate_portfolio(&stats, config)?;
    Ok((stats, result))
}
