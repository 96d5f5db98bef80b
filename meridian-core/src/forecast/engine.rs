//! Per-ticker forecast driver.
//!
//! For each price column: skip short series, choose `d` with the ADF test,
//! select the ARIMA order stepwise, then forecast at 80% and 95%. A failing
//! ticker becomes `TickerOutcome::Skipped` and never affects its siblings.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::adf::{adf_test, AdfResult};
use super::arima::ArimaOrder;
use super::stepwise::{auto_arima, AutoArimaConfig};
use super::ForecastError;
use crate::data::calendar::months_after;
use crate::data::PriceMatrix;
use crate::diagnostics::Diagnostic;
use crate::stats::round_to;

/// Months forecast per ticker.
pub const FORECAST_HORIZON: usize = 12;

/// Series shorter than this are skipped.
pub const MIN_OBSERVATIONS: usize = 12;

const ALPHA_80: f64 = 0.20;
const ALPHA_95: f64 = 0.05;

/// Forecast engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub horizon: usize,
    pub min_observations: usize,
    pub search: AutoArimaConfig,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: FORECAST_HORIZON,
            min_observations: MIN_OBSERVATIONS,
            search: AutoArimaConfig::default(),
        }
    }
}

/// One forecast month for one ticker, values rounded to 4 decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub forecast: f64,
    pub lower_80: f64,
    pub upper_80: f64,
    pub lower_95: f64,
    pub upper_95: f64,
}

/// Why a ticker produced no forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientHistory { observations: usize },
    FitFailed(String),
}

/// Result for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TickerOutcome {
    Forecast {
        adf: AdfResult,
        order: ArimaOrder,
        with_constant: bool,
        aic: f64,
        records: Vec<ForecastRecord>,
    },
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerForecast {
    pub ticker: String,
    pub outcome: TickerOutcome,
}

/// Expected return implied by the last forecast month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReturn {
    pub ticker: String,
    pub last_price: f64,
    pub final_forecast: f64,
    /// `(final_forecast / last_price − 1) × 100`, rounded to 2 decimals.
    pub return_pct: f64,
}

/// Outcomes for every ticker plus the stage diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRun {
    pub tickers: Vec<TickerForecast>,
    pub returns: Vec<ForecastReturn>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ForecastRun {
    /// All forecast records in ticker order.
    pub fn records(&self) -> Vec<ForecastRecord> {
        self.tickers
            .iter()
            .filter_map(|t| match &t.outcome {
                TickerOutcome::Forecast { records, .. } => Some(records.iter().cloned()),
                TickerOutcome::Skipped(_) => None,
            })
            .flatten()
            .collect()
    }

    /// Tickers that produced a forecast.
    pub fn forecast_tickers(&self) -> Vec<&str> {
        self.tickers
            .iter()
            .filter(|t| matches!(t.outcome, TickerOutcome::Forecast { .. }))
            .map(|t| t.ticker.as_str())
            .collect()
    }
}

/// Forecast every column of the matrix.
pub fn run_forecasts(matrix: &PriceMatrix, config: &ForecastConfig) -> ForecastRun {
    let mut diagnostics = Vec::new();
    let mut tickers = Vec::with_capacity(matrix.tickers().len());
    let mut returns = Vec::new();

    let Some(last_date) = matrix.last_date() else {
        diagnostics.push(Diagnostic::error("Forecast: price matrix is empty"));
        return ForecastRun {
            tickers,
            returns,
            diagnostics,
        };
    };

    for (ticker, series) in matrix.iter_series() {
        let (outcome, diags) = forecast_ticker(ticker, series, last_date, config);
        diagnostics.extend(diags);

        if let (TickerOutcome::Forecast { records, .. }, Some(&last_price)) =
            (&outcome, series.last())
        {
            if let Some(last) = records.last() {
                returns.push(ForecastReturn {
                    ticker: ticker.to_string(),
                    last_price,
                    final_forecast: last.forecast,
                    return_pct: round_to((last.forecast / last_price - 1.0) * 100.0, 2),
                });
            }
        }
        tickers.push(TickerForecast {
            ticker: ticker.to_string(),
            outcome,
        });
    }

    let produced = tickers
        .iter()
        .filter(|t| matches!(t.outcome, TickerOutcome::Forecast { .. }))
        .count();
    diagnostics.push(Diagnostic::qa(format!(
        "Forecast: {} records for {produced}/{} tickers",
        produced * config.horizon,
        tickers.len()
    )));

    ForecastRun {
        tickers,
        returns,
        diagnostics,
    }
}

/// Forecast one series whose last observation falls in `last_date`'s month.
pub fn forecast_ticker(
    ticker: &str,
    series: &[f64],
    last_date: NaiveDate,
    config: &ForecastConfig,
) -> (TickerOutcome, Vec<Diagnostic>) {
    let mut diags = Vec::new();

    if series.len() < config.min_observations {
        warn!(pipeline = "financial", ticker, observations = series.len(), "series too short, skipping");
        diags.push(Diagnostic::warn(format!(
            "{ticker}: series too short ({} obs), ARIMA skipped",
            series.len()
        )));
        return (
            TickerOutcome::Skipped(SkipReason::InsufficientHistory {
                observations: series.len(),
            }),
            diags,
        );
    }

    match fit_and_forecast(ticker, series, last_date, config) {
        Ok((outcome, adf_msg)) => {
            diags.push(Diagnostic::ok(adf_msg));
            if let TickerOutcome::Forecast { order, aic, .. } = &outcome {
                info!(pipeline = "financial", ticker, order = %order, aic, "forecast complete");
                diags.push(Diagnostic::ok(format!(
                    "ARIMA {ticker}: {order} -> {}-month forecast ok",
                    config.horizon
                )));
            }
            (outcome, diags)
        }
        Err(e) => {
            warn!(pipeline = "financial", ticker, error = %e, "forecast failed");
            diags.push(Diagnostic::error(format!("ARIMA {ticker}: {e}")));
            (TickerOutcome::Skipped(SkipReason::FitFailed(e.to_string())), diags)
        }
    }
}

fn fit_and_forecast(
    ticker: &str,
    series: &[f64],
    last_date: NaiveDate,
    config: &ForecastConfig,
) -> Result<(TickerOutcome, String), ForecastError> {
    let adf = adf_test(series)?;
    let d = adf.differencing_order();
    let adf_msg = format!("{ticker}: ADF p={:.4} -> d={d}", adf.p_value);
    info!(pipeline = "financial", ticker, p_value = adf.p_value, d, "ADF test");

    let fit = auto_arima(series, d, &config.search)?;
    let model = fit.model;
    let fc80 = model.forecast(config.horizon, ALPHA_80)?;
    let fc95 = model.forecast(config.horizon, ALPHA_95)?;

    let dates = months_after(last_date, config.horizon);
    let records = (0..config.horizon)
        .map(|h| ForecastRecord {
            ticker: ticker.to_string(),
            date: dates[h],
            forecast: round_to(fc80.mean[h], 4),
            lower_80: round_to(fc80.lower[h], 4),
            upper_80: round_to(fc80.upper[h], 4),
            lower_95: round_to(fc95.lower[h], 4),
            upper_95: round_to(fc95.upper[h], 4),
        })
        .collect::<Vec<_>>();

    if records.iter().any(|r| !r.forecast.is_finite()) {
        return Err(ForecastError::FitFailed("non-finite forecast".into()));
    }

    Ok((
        TickerOutcome::Forecast {
            adf,
            order: model.spec.order,
            with_constant: model.spec.with_constant,
            aic: model.aic,
            records,
        },
        adf_msg,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn short_series_is_skipped() {
        let (outcome, diags) =
            forecast_ticker("X", &[1.0; 11], d(2024, 1), &ForecastConfig::default());
        assert_eq!(
            outcome,
            TickerOutcome::Skipped(SkipReason::InsufficientHistory { observations: 11 })
        );
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn constant_series_differenced_and_flat() {
        let (outcome, _) =
            forecast_ticker("TEST", &[100.0; 24], d(2024, 12), &ForecastConfig::default());
        let TickerOutcome::Forecast { adf, order, records, .. } = outcome else {
            panic!("expected a forecast");
        };
        assert_eq!(adf.differencing_order(), 1);
        assert_eq!(order.d, 1);
        assert_eq!(records.len(), 12);
        assert_eq!(records[0].date, d(2025, 1));
        assert_eq!(records[11].date, d(2025, 12));
        for r in &records {
            assert!((r.forecast - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn run_collects_returns_for_forecast_tickers() {
        let dates: Vec<NaiveDate> = (0..24).map(|i| d(2023 + i / 12, (i % 12) as u32 + 1)).collect();
        let trend: Vec<f64> = (0..24).map(|i| 50.0 + i as f64 + (i % 3) as f64).collect();
        let matrix = PriceMatrix::new(
            dates,
            vec!["A".into(), "B".into()],
            vec![vec![100.0; 24], trend],
        );
        let run = run_forecasts(&matrix, &ForecastConfig::default());
        assert_eq!(run.tickers.len(), 2);
        assert_eq!(run.records().len(), 24);
        assert_eq!(run.returns.len(), 2);
        assert_eq!(run.returns[0].return_pct, 0.0);
    }
}
