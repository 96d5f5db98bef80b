//! Non-seasonal ARIMA(p, d, q) estimation and forecasting.
//!
//! Estimation minimizes the conditional sum of squares of the differenced
//! series `w = Δ^d y`:
//!
//! ```text
//! e_t = (w_t − μ) − Σ φ_i (w_{t−i} − μ) − Σ θ_j e_{t−j},   t ≥ p
//! ```
//!
//! AR and MA coefficients are optimized through partial autocorrelations
//! `r = u / √(1 + u²)` mapped by Durbin–Levinson, which keeps the AR part
//! stationary and the MA part invertible for every unconstrained `u`.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

use super::optimizer::{nelder_mead, NelderMeadOptions};
use super::ForecastError;
use crate::stats::normal_quantile;

/// Variance floor for perfectly fitted (e.g. constant) series.
const MIN_SIGMA2: f64 = 1e-12;

/// Model order `(p, d, q)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Order plus whether a constant (mean of the differenced series) is fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArimaSpec {
    pub order: ArimaOrder,
    pub with_constant: bool,
}

impl ArimaSpec {
    pub fn new(p: usize, d: usize, q: usize, with_constant: bool) -> Self {
        Self {
            order: ArimaOrder::new(p, d, q),
            with_constant,
        }
    }

    /// Estimated parameters excluding the innovation variance.
    pub fn n_params(&self) -> usize {
        self.order.p + self.order.q + usize::from(self.with_constant)
    }
}

/// A fitted ARIMA model with the state needed to forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArimaModel {
    pub spec: ArimaSpec,
    /// Mean of the differenced series (0 without constant).
    pub constant: f64,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    pub sigma2: f64,
    pub loglik: f64,
    pub aic: f64,
    /// Residuals entering the likelihood.
    pub nobs: usize,
    /// Differenced series the model was fitted on.
    differenced: Vec<f64>,
    /// CSS residuals aligned with `differenced` (zero before `p`).
    residuals: Vec<f64>,
    /// Last value of `Δ^k y` for `k = 0..d`, used to integrate forecasts.
    anchors: Vec<f64>,
}

/// Point forecasts with a symmetric interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub mean: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub std_errors: Vec<f64>,
}

// ─── Fitting ─────────────────────────────────────────────────────────

/// Fit an ARIMA model by conditional sum of squares.
pub fn fit_arima(series: &[f64], spec: ArimaSpec) -> Result<ArimaModel, ForecastError> {
    if series.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::NonFinite);
    }
    let ArimaOrder { p, d, q } = spec.order;

    let mut anchors = Vec::with_capacity(d);
    let mut w = series.to_vec();
    for _ in 0..d {
        let Some(&last) = w.last() else { break };
        anchors.push(last);
        w = w.windows(2).map(|v| v[1] - v[0]).collect();
    }

    let needed = p + spec.n_params() + 2;
    if w.len() < needed {
        return Err(ForecastError::TooShort {
            needed: needed + d,
            got: series.len(),
        });
    }
    let n_eff = w.len() - p;

    // Optimize on a unit-scale copy so one simplex step fits every series.
    let rms = (w.iter().map(|v| v * v).sum::<f64>() / w.len() as f64).sqrt();
    let scale = if rms.is_finite() && rms > 0.0 { rms } else { 1.0 };
    let ws: Vec<f64> = w.iter().map(|v| v / scale).collect();

    let mut x0 = Vec::with_capacity(spec.n_params());
    if spec.with_constant {
        x0.push(ws.iter().sum::<f64>() / ws.len() as f64);
    }
    x0.extend(std::iter::repeat(0.0).take(p + q));

    let objective = |x: &[f64]| {
        let (mu, ar, ma) = decode(x, spec);
        let (ssr, _) = css_residuals(&ws, mu, &ar, &ma);
        ssr
    };
    let min = nelder_mead(objective, &x0, &NelderMeadOptions::default());
    if !min.value.is_finite() {
        return Err(ForecastError::FitFailed(format!(
            "ARIMA{} objective did not converge to a finite value",
            spec.order
        )));
    }

    let (mu_s, ar, ma) = decode(&min.x, spec);
    let constant = mu_s * scale;
    let (ssr, residuals) = css_residuals(&w, constant, &ar, &ma);
    let sigma2 = (ssr / n_eff as f64).max(MIN_SIGMA2);
    let loglik = -(n_eff as f64) / 2.0 * ((2.0 * PI * sigma2).ln() + 1.0);
    let aic = -2.0 * loglik + 2.0 * (spec.n_params() + 1) as f64;

    Ok(ArimaModel {
        spec,
        constant,
        ar,
        ma,
        sigma2,
        loglik,
        aic,
        nobs: n_eff,
        differenced: w,
        residuals,
        anchors,
    })
}

/// Split an optimizer vector into `(μ, φ, θ)`.
fn decode(x: &[f64], spec: ArimaSpec) -> (f64, Vec<f64>, Vec<f64>) {
    let ArimaOrder { p, q, .. } = spec.order;
    let (mu, rest) = if spec.with_constant {
        (x[0], &x[1..])
    } else {
        (0.0, x)
    };
    let ar = pacf_to_coefficients(&rest[..p]);
    let ma = pacf_to_coefficients(&rest[p..p + q])
        .into_iter()
        .map(|c| -c)
        .collect();
    (mu, ar, ma)
}

/// Map unconstrained values to the coefficients of a stationary AR polynomial
/// `1 − Σ φ_i B^i` via partial autocorrelations in (−1, 1).
pub fn pacf_to_coefficients(u: &[f64]) -> Vec<f64> {
    let mut phi: Vec<f64> = Vec::with_capacity(u.len());
    for &uk in u {
        let r = uk / (1.0 + uk * uk).sqrt();
        let prev = phi.clone();
        let k = prev.len();
        for j in 0..k {
            phi[j] = prev[j] - r * prev[k - 1 - j];
        }
        phi.push(r);
    }
    phi
}

/// Conditional residuals and their sum of squares from `t = p` onward.
fn css_residuals(w: &[f64], mu: f64, ar: &[f64], ma: &[f64]) -> (f64, Vec<f64>) {
    let p = ar.len();
    let mut e = vec![0.0; w.len()];
    let mut ssr = 0.0;
    for t in p..w.len() {
        let mut pred = mu;
        for (i, phi) in ar.iter().enumerate() {
            pred += phi * (w[t - 1 - i] - mu);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                pred += theta * e[t - 1 - j];
            }
        }
        e[t] = w[t] - pred;
        ssr += e[t] * e[t];
    }
    (ssr, e)
}

// ─── Forecasting ─────────────────────────────────────────────────────

impl ArimaModel {
    /// Forecast `steps` periods with a `1 − alpha` interval.
    pub fn forecast(&self, steps: usize, alpha: f64) -> Result<Forecast, ForecastError> {
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ForecastError::InvalidAlpha(alpha));
        }

        // ARMA recursion on the differenced scale with future shocks at zero.
        let n = self.differenced.len();
        let mut w = self.differenced.clone();
        let mut e = self.residuals.clone();
        for _ in 0..steps {
            let t = w.len();
            let mut pred = self.constant;
            for (i, phi) in self.ar.iter().enumerate() {
                pred += phi * (w[t - 1 - i] - self.constant);
            }
            for (j, theta) in self.ma.iter().enumerate() {
                if t > j {
                    pred += theta * e[t - 1 - j];
                }
            }
            w.push(pred);
            e.push(0.0);
        }
        let mut mean = w[n..].to_vec();

        // Undo differencing, innermost first.
        for &anchor in self.anchors.iter().rev() {
            let mut level = anchor;
            for v in mean.iter_mut() {
                level += *v;
                *v = level;
            }
        }

        let psi = self.psi_weights(steps);
        let z = normal_quantile(1.0 - alpha / 2.0);
        let mut cumulative = 0.0;
        let std_errors: Vec<f64> = psi
            .iter()
            .map(|w| {
                cumulative += w * w;
                (self.sigma2 * cumulative).sqrt()
            })
            .collect();

        let lower = mean.iter().zip(&std_errors).map(|(m, s)| m - z * s).collect();
        let upper = mean.iter().zip(&std_errors).map(|(m, s)| m + z * s).collect();
        Ok(Forecast {
            mean,
            lower,
            upper,
            std_errors,
        })
    }

    /// First `steps` ψ-weights of the integrated model, ψ_0 = 1.
    pub fn psi_weights(&self, steps: usize) -> Vec<f64> {
        let mut psi = vec![0.0; steps];
        for j in 0..steps {
            if j == 0 {
                psi[0] = 1.0;
                continue;
            }
            let mut v = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for (i, phi) in self.ar.iter().enumerate().take(j) {
                v += phi * psi[j - 1 - i];
            }
            psi[j] = v;
        }
        for _ in 0..self.spec.order.d {
            let mut acc = 0.0;
            for v in psi.iter_mut() {
                acc += *v;
                *v = acc;
            }
        }
        psi
    }
}
