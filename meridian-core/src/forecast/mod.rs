//! Forecast engine: ADF stationarity test, stepwise ARIMA selection,
//! 12-month forecasts with 80% and 95% intervals.

pub mod adf;
pub mod arima;
pub mod engine;
pub mod optimizer;
pub mod stepwise;

pub use adf::{adf_test, differencing_order, AdfResult, CriticalValues};
pub use arima::{fit_arima, ArimaModel, ArimaOrder, ArimaSpec, Forecast};
pub use engine::{
    forecast_ticker, run_forecasts, ForecastConfig, ForecastRecord, ForecastReturn, ForecastRun,
    SkipReason, TickerForecast, TickerOutcome, FORECAST_HORIZON, MIN_OBSERVATIONS,
};
pub use stepwise::{auto_arima, AutoArimaConfig, AutoArimaFit};

use thiserror::Error;

use crate::stats::StatsError;

/// Errors from model fitting and forecasting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("series too short: need {needed} observations, got {got}")]
    TooShort { needed: usize, got: usize },

    #[error("series contains non-finite values")]
    NonFinite,

    #[error("interval alpha must be in (0, 1), got {0}")]
    InvalidAlpha(f64),

    #[error("model fit failed: {0}")]
    FitFailed(String),

    #[error("no candidate model could be fitted")]
    NoModelFitted,

    #[error(transparent)]
    Stats(#[from] StatsError),
}
