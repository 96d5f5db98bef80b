//! Portfolio risk metrics from simulated terminal values.
//!
//! Terminal values are growth multiples of a unit investment. Every reported
//! value is a return (`terminal − 1`) rounded to 4 decimals.

use serde::{Deserialize, Serialize};

use crate::stats::descriptive::percentile_sorted;
use crate::stats::round_to;

/// Summary of the terminal value distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMetrics {
    /// 5th percentile return (95% Value at Risk).
    pub var_95: f64,
    /// Mean return of the trajectories at or below the VaR threshold.
    pub cvar_95: f64,
    /// 5th percentile return.
    pub worst_case: f64,
    /// Median return.
    pub base_case: f64,
    /// 95th percentile return.
    pub best_case: f64,
    /// Share of trajectories ending above 1.0, in percent (2 decimals).
    pub pct_positive: f64,
    pub n_simulations: usize,
}

impl RiskMetrics {
    /// Compute metrics from terminal values. Returns `None` when empty.
    pub fn from_terminal_values(finals: &[f64]) -> Option<Self> {
        if finals.is_empty() {
            return None;
        }
        let mut sorted = finals.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let p5 = percentile_sorted(&sorted, 5.0);
        let p50 = percentile_sorted(&sorted, 50.0);
        let p95 = percentile_sorted(&sorted, 95.0);

        // at least the minimum is always <= p5
        let tail: Vec<f64> = sorted.iter().copied().take_while(|v| *v <= p5).collect();
        let cvar = tail.iter().sum::<f64>() / tail.len().max(1) as f64;

        let positive = finals.iter().filter(|v| **v > 1.0).count();
        let pct_positive = positive as f64 / finals.len() as f64 * 100.0;

        Some(Self {
            var_95: round_to(p5 - 1.0, 4),
            cvar_95: round_to(cvar - 1.0, 4),
            worst_case: round_to(p5 - 1.0, 4),
            base_case: round_to(p50 - 1.0, 4),
            best_case: round_to(p95 - 1.0, 4),
            pct_positive: round_to(pct_positive, 2),
            n_simulations: finals.len(),
        })
    }

    /// One-line summary for the run log.
    pub fn summary_line(&self) -> String {
        format!(
            "Monte Carlo: VaR95={:.2}%, CVaR={:.2}%, P50={:.2}%, P95={:.2}%, positive={:.1}%",
            self.var_95 * 100.0,
            self.cvar_95 * 100.0,
            self.base_case * 100.0,
            self.best_case * 100.0,
            self.pct_positive
        )
    }
}
