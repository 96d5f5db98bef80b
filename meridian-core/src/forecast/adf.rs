//! Augmented Dickey–Fuller unit-root test.
//!
//! Constant-only regression
//!
//! ```text
//! Δy_t = α + γ·y_{t-1} + Σ_{i=1..k} β_i·Δy_{t-i} + ε_t
//! ```
//!
//! with the lag length `k` chosen by AIC on a common sample, then refit on the
//! longest sample for that `k`. The statistic is the t-value of γ. P-values
//! use MacKinnon's (1994) approximate response surface and critical values
//! MacKinnon's (2010) finite-sample table, both for one series with a
//! constant.

use serde::{Deserialize, Serialize};

use crate::linalg::ols;
use crate::stats::{normal_cdf, StatsError};

/// Significance level below which the series is treated as stationary.
pub const STATIONARITY_ALPHA: f64 = 0.05;

// MacKinnon (1994), N = 1, constant only.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALLP: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGEP: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010), N = 1, constant only: b0 + b1/T + b2/T² + b3/T³.
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Critical values of the test statistic at the sample size used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

/// Result of an ADF test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// `None` when the regression is degenerate (e.g. a constant series).
    pub statistic: Option<f64>,
    pub p_value: f64,
    pub used_lag: usize,
    /// Observations in the final regression.
    pub nobs: usize,
    pub critical_values: Option<CriticalValues>,
}

impl AdfResult {
    fn degenerate(used_lag: usize, nobs: usize) -> Self {
        Self {
            statistic: None,
            p_value: 1.0,
            used_lag,
            nobs,
            critical_values: None,
        }
    }

    pub fn differencing_order(&self) -> usize {
        differencing_order(self.p_value)
    }
}

/// `0` when the unit root is rejected at 5%, else `1`.
pub fn differencing_order(p_value: f64) -> usize {
    if p_value < STATIONARITY_ALPHA {
        0
    } else {
        1
    }
}

/// Default maximum lag: `ceil(12·(n/100)^¼)`, capped at `n/2 − 2`.
pub fn default_max_lag(n: usize) -> usize {
    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    schwert.min((n / 2).saturating_sub(2))
}

/// Run the ADF test on a level series.
pub fn adf_test(series: &[f64]) -> Result<AdfResult, StatsError> {
    let n = series.len();
    if n < 4 {
        return Err(StatsError::InsufficientData { needed: 4, got: n });
    }
    if series.iter().any(|v| !v.is_finite()) {
        return Err(StatsError::NonFinite);
    }

    let max_lag = default_max_lag(n);
    let (lo, hi) = series
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if lo == hi {
        return Ok(AdfResult::degenerate(0, n - 1 - max_lag));
    }

    let diffs: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the common sample defined by `max_lag`.
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (y, x) = regression(series, &diffs, lag, max_lag);
        let Ok(fit) = ols(&y, &x) else { continue };
        // strict `<` keeps the smaller lag on ties
        if best.map_or(true, |(aic, _)| fit.aic < aic) {
            best = Some((fit.aic, lag));
        }
    }
    let Some((_, used_lag)) = best else {
        return Ok(AdfResult::degenerate(0, n - 1 - max_lag));
    };

    let (y, x) = regression(series, &diffs, used_lag, used_lag);
    let nobs = y.len();
    let fit = match ols(&y, &x) {
        Ok(fit) => fit,
        Err(_) => return Ok(AdfResult::degenerate(used_lag, nobs)),
    };
    // column 0 is the lagged level
    let statistic = fit.t_value(0);
    if !statistic.is_finite() {
        return Ok(AdfResult::degenerate(used_lag, nobs));
    }

    Ok(AdfResult {
        statistic: Some(statistic),
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values: Some(critical_values(nobs)),
    })
}

/// Build `(Δy_t, [y_{t-1}, Δy_{t-1}..Δy_{t-lag}, 1])` for `t` past `trim`.
///
/// `trim ≥ lag` fixes the first usable difference so that regressions with
/// different lags share a sample.
fn regression(levels: &[f64], diffs: &[f64], lag: usize, trim: usize) -> (Vec<f64>, Vec<Vec<f64>>) {
    let mut y = Vec::with_capacity(diffs.len().saturating_sub(trim));
    let mut x = Vec::with_capacity(y.capacity());
    // diffs[t] = levels[t + 1] - levels[t]
    for t in trim..diffs.len() {
        let mut row = Vec::with_capacity(lag + 2);
        row.push(levels[t]);
        for i in 1..=lag {
            row.push(diffs[t - i]);
        }
        row.push(1.0);
        y.push(diffs[t]);
        x.push(row);
    }
    (y, x)
}

/// Approximate asymptotic p-value of the ADF statistic.
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coefs: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALLP
    } else {
        &TAU_LARGEP
    };
    normal_cdf(polyval_ascending(coefs, statistic))
}

/// Finite-sample critical values for `nobs` observations.
pub fn critical_values(nobs: usize) -> CriticalValues {
    let at = |b: &[f64; 4]| {
        let t = nobs as f64;
        b[0] + b[1] / t + b[2] / (t * t) + b[3] / (t * t * t)
    };
    CriticalValues {
        one_pct: at(&CRIT_1),
        five_pct: at(&CRIT_5),
        ten_pct: at(&CRIT_10),
    }
}

fn polyval_ascending(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::standard_normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| standard_normal(&mut rng)).collect()
    }

    #[test]
    fn p_value_at_five_pct_critical_value() {
        let p = mackinnon_p_value(-2.8615);
        assert!((p - 0.05).abs() < 0.003, "p = {p}");
    }

    #[test]
    fn p_value_bounds_and_monotone() {
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        assert_eq!(mackinnon_p_value(-20.0), 0.0);
        let mut prev = 0.0;
        for i in 0..60 {
            let t = -10.0 + i as f64 * 0.2;
            let p = mackinnon_p_value(t);
            assert!(p >= prev - 1e-9, "not monotone at {t}");
            prev = p;
        }
    }

    #[test]
    fn critical_values_ordered() {
        let cv = critical_values(50);
        assert!(cv.one_pct < cv.five_pct && cv.five_pct < cv.ten_pct);
        assert!((critical_values(100_000).five_pct + 2.8615).abs() < 1e-3);
    }

    #[test]
    fn default_max_lag_caps_short_series() {
        assert_eq!(default_max_lag(100), 12);
        assert_eq!(default_max_lag(12), 4);
        assert_eq!(default_max_lag(60), 11);
    }

    #[test]
    fn white_noise_is_stationary() {
        let r = adf_test(&noise(200, 3)).unwrap();
        assert!(r.statistic.unwrap() < -3.0);
        assert_eq!(r.differencing_order(), 0);
    }

    #[test]
    fn random_walk_needs_differencing() {
        let mut level = 100.0;
        let walk: Vec<f64> = noise(200, 11)
            .into_iter()
            .map(|e| {
                level += e;
                level
            })
            .collect();
        let r = adf_test(&walk).unwrap();
        assert_eq!(r.differencing_order(), 1, "p = {}", r.p_value);
    }

    #[test]
    fn constant_series_is_degenerate() {
        let r = adf_test(&[100.0; 30]).unwrap();
        assert!(r.statistic.is_none());
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.differencing_order(), 1);
    }

    #[test]
    fn too_short_is_an_error() {
        assert!(adf_test(&[1.0, 2.0, 3.0]).is_err());
    }
}
