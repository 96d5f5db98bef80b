//! Correlated Monte Carlo simulation of an equal-weight portfolio.
//!
//! Each month draws one multivariate normal return vector
//! `r = μ + L·z` (L the Cholesky factor of the covariance, z standard normal
//! by Box–Muller) and compounds the weighted portfolio return. A single
//! seeded generator is consumed in trajectory order, so a fixed seed gives
//! bit-identical output.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::metrics::RiskMetrics;
use super::returns::ReturnStatistics;
use super::RiskError;
use crate::linalg::{cholesky, lower_mul};
use crate::rng::standard_normal;
use crate::stats::round_to;

const JITTER_ATTEMPTS: u32 = 6;

/// Simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonteCarloConfig {
    pub n_simulations: usize,
    pub horizon_months: usize,
    /// Full paths kept for the first `path_sample` trajectories.
    pub path_sample: usize,
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            n_simulations: 5_000,
            horizon_months: 12,
            path_sample: 500,
            seed: 42,
        }
    }
}

/// One trajectory's terminal value and return in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryOutcome {
    pub final_value: f64,
    pub return_pct: f64,
}

/// Simulation output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    /// Terminal value of each trajectory, unit initial investment.
    pub finals: Vec<f64>,
    /// Sampled paths: `horizon_months + 1` values starting at 1.0, rounded to 6.
    pub paths: Vec<Vec<f64>>,
    pub metrics: RiskMetrics,
    pub config: MonteCarloConfig,
}

impl SimulationResult {
    pub fn outcomes(&self) -> impl Iterator<Item = TrajectoryOutcome> + '_ {
        self.finals.iter().map(|&v| TrajectoryOutcome {
            final_value: v,
            return_pct: (v - 1.0) * 100.0,
        })
    }
}

/// Run the simulation from estimated return statistics.
pub fn simulate_portfolio(
    stats: &ReturnStatistics,
    config: &MonteCarloConfig,
) -> Result<SimulationResult, RiskError> {
    if config.n_simulations == 0 || config.horizon_months == 0 {
        return Err(RiskError::InvalidConfig(format!(
            "n_simulations ({}) and horizon_months ({}) must be positive",
            config.n_simulations, config.horizon_months
        )));
    }
    let k = stats.n_assets();
    if k == 0 {
        return Err(RiskError::NoAssets);
    }

    let factor = factorize_with_jitter(&stats.covariance)?;
    let weights = vec![1.0 / k as f64; k];
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut finals = Vec::with_capacity(config.n_simulations);
    let mut paths = Vec::with_capacity(config.path_sample.min(config.n_simulations));
    let mut z = vec![0.0; k];

    for sim in 0..config.n_simulations {
        let keep_path = sim < config.path_sample;
        let mut path = Vec::with_capacity(if keep_path { config.horizon_months + 1 } else { 0 });
        if keep_path {
            path.push(1.0);
        }

        let mut cumulative = 1.0;
        for _ in 0..config.horizon_months {
            z.iter_mut().for_each(|v| *v = standard_normal(&mut rng));
            let shock = lower_mul(&factor, &z);
            let portfolio: f64 = weights
                .iter()
                .zip(stats.mean.iter().zip(&shock))
                .map(|(w, (m, s))| w * (m + s))
                .sum();
            cumulative *= 1.0 + portfolio;
            if keep_path {
                path.push(round_to(cumulative, 6));
            }
        }

        finals.push(cumulative);
        if keep_path {
            paths.push(path);
        }
    }

    let metrics = RiskMetrics::from_terminal_values(&finals)
        .ok_or_else(|| RiskError::InvalidConfig("simulation produced no trajectories".into()))?;
    info!(
        pipeline = "financial",
        n_simulations = config.n_simulations,
        var_95 = metrics.var_95,
        cvar_95 = metrics.cvar_95,
        "Monte Carlo complete"
    );

    Ok(SimulationResult {
        tickers: stats.tickers.clone(),
        weights,
        finals,
        paths,
        metrics,
        config: *config,
    })
}

/// Cholesky factor of the covariance, adding a growing diagonal jitter when
/// the matrix is only positive semi-definite (e.g. a zero-variance asset).
fn factorize_with_jitter(cov: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, RiskError> {
    if let Ok(l) = cholesky(cov) {
        return Ok(l);
    }
    let k = cov.len().max(1);
    let avg_diag = (0..cov.len()).map(|i| cov[i][i].abs()).sum::<f64>() / k as f64;
    let mut jitter = (avg_diag * 1e-10).max(1e-14);
    for attempt in 1..=JITTER_ATTEMPTS {
        let mut adjusted = cov.to_vec();
        for (i, row) in adjusted.iter_mut().enumerate() {
            row[i] += jitter;
        }
        if let Ok(l) = cholesky(&adjusted) {
            debug!(attempt, jitter, "covariance factorized with jitter");
            return Ok(l);
        }
        jitter *= 100.0;
    }
    Err(RiskError::CovarianceNotPositiveDefinite)
}
