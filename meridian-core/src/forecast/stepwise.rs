//! Stepwise ARIMA order search (Hyndman–Khandakar).
//!
//! Starts from a handful of small models, then repeatedly tries the
//! neighbours of the current best (p ± 1, q ± 1, both together, and the
//! constant toggled), moving as soon as one lowers the AIC. The search ends
//! when no neighbour improves. Models that fail to fit are ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::arima::{fit_arima, ArimaModel, ArimaSpec};
use super::ForecastError;

/// Search bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutoArimaConfig {
    pub max_p: usize,
    pub max_q: usize,
    /// Upper bound on `p + q`.
    pub max_order: usize,
    /// Upper bound on models fitted.
    pub max_models: usize,
}

impl Default for AutoArimaConfig {
    fn default() -> Self {
        Self {
            max_p: 3,
            max_q: 3,
            max_order: 5,
            max_models: 100,
        }
    }
}

/// Selected model and search bookkeeping.
#[derive(Debug, Clone)]
pub struct AutoArimaFit {
    pub model: ArimaModel,
    pub models_fitted: usize,
}

/// Select `(p, d, q)` with `d` fixed by minimizing AIC stepwise.
pub fn auto_arima(
    series: &[f64],
    d: usize,
    config: &AutoArimaConfig,
) -> Result<AutoArimaFit, ForecastError> {
    let allowed = |spec: &ArimaSpec| {
        spec.order.p <= config.max_p
            && spec.order.q <= config.max_q
            && spec.order.p + spec.order.q <= config.max_order
    };

    let mut tried: HashSet<ArimaSpec> = HashSet::new();
    let mut best: Option<ArimaModel> = None;
    let mut last_error: Option<ForecastError> = None;

    // Fits `spec` unless already tried; returns whether it became the best.
    let mut consider = |spec: ArimaSpec, best: &mut Option<ArimaModel>| -> bool {
        if !allowed(&spec) || !tried.insert(spec) || tried.len() > config.max_models {
            return false;
        }
        match fit_arima(series, spec) {
            Ok(model) => {
                debug!(order = %spec.order, constant = spec.with_constant, aic = model.aic, "fitted");
                let improves = best.as_ref().map_or(true, |b| model.aic < b.aic);
                if improves {
                    *best = Some(model);
                }
                improves
            }
            Err(e) => {
                debug!(order = %spec.order, constant = spec.with_constant, error = %e, "fit failed");
                last_error = Some(e);
                false
            }
        }
    };

    for spec in [
        ArimaSpec::new(0, d, 0, true),
        ArimaSpec::new(1, d, 0, true),
        ArimaSpec::new(0, d, 1, true),
        ArimaSpec::new(0, d, 0, false),
    ] {
        consider(spec, &mut best);
    }

    loop {
        let Some(current) = best.as_ref().map(|m| m.spec) else {
            break;
        };
        let moved = neighbours(current)
            .into_iter()
            .any(|spec| consider(spec, &mut best));
        if !moved {
            break;
        }
    }

    let models_fitted = tried.len().min(config.max_models);
    match best {
        Some(model) => Ok(AutoArimaFit {
            model,
            models_fitted,
        }),
        None => Err(last_error.unwrap_or(ForecastError::NoModelFitted)),
    }
}

/// Stepwise neighbours of a model, in visiting order.
fn neighbours(spec: ArimaSpec) -> Vec<ArimaSpec> {
    let (p, d, q) = (spec.order.p as i64, spec.order.d, spec.order.q as i64);
    let c = spec.with_constant;
    let moves: [(i64, i64); 8] = [
        (-1, 0),
        (1, 0),
        (0, -1),
        (0, 1),
        (-1, -1),
        (-1, 1),
        (1, -1),
        (1, 1),
    ];
    let mut out: Vec<ArimaSpec> = moves
        .iter()
        .filter_map(|&(dp, dq)| {
            let (np, nq) = (p + dp, q + dq);
            (np >= 0 && nq >= 0).then(|| ArimaSpec::new(np as usize, d, nq as usize, c))
        })
        .collect();
    out.push(ArimaSpec::new(p as usize, d, q as usize, !c));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::standard_normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn neighbours_stay_non_negative() {
        let n = neighbours(ArimaSpec::new(0, 1, 0, true));
        assert!(n.contains(&ArimaSpec::new(1, 1, 1, true)));
        assert!(n.contains(&ArimaSpec::new(0, 1, 0, false)));
        assert_eq!(n.len(), 4);
    }

    #[test]
    fn selects_ar_structure_for_ar2() {
        let mut rng = StdRng::seed_from_u64(21);
        let mut y = vec![0.0, 0.0];
        for t in 2..500 {
            let v = 0.5 * y[t - 1] + 0.3 * y[t - 2] + standard_normal(&mut rng);
            y.push(v);
        }
        let fit = auto_arima(&y, 0, &AutoArimaConfig::default()).unwrap();
        let order = fit.model.spec.order;
        assert!(order.p >= 1, "selected {order}");
        assert!(order.p + order.q <= 5);
        assert!(fit.models_fitted >= 4);
    }

    #[test]
    fn respects_bounds() {
        let mut rng = StdRng::seed_from_u64(4);
        let y: Vec<f64> = (0..80).map(|_| standard_normal(&mut rng)).collect();
        let config = AutoArimaConfig {
            max_p: 1,
            max_q: 1,
            max_order: 1,
            ..Default::default()
        };
        let fit = auto_arima(&y, 0, &config).unwrap();
        let o = fit.model.spec.order;
        assert!(o.p <= 1 && o.q <= 1 && o.p + o.q <= 1);
    }

    #[test]
    fn no_fittable_model_is_an_error() {
        assert!(auto_arima(&[1.0, 2.0], 1, &AutoArimaConfig::default()).is_err());
    }
}
