//! Financial pipeline: prices → forecasts → Monte Carlo → exports.
//!
//! Stage failures never abort the run. A ticker that cannot be forecast is
//! skipped, and a simulation error is reported while every other output is
//! still written.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};

use meridian_core::data::{PriceCache, PriceMatrix, PriceProvider};
use meridian_core::diagnostics::{self, Diagnostic, Severity};
use meridian_core::forecast::{
    run_forecasts, ForecastConfig, ForecastReturn, ForecastRun, SkipReason, TickerOutcome,
};
use meridian_core::risk::{run_monte_carlo, ReturnStatistics, RiskMetrics, SimulationResult};

use crate::config::PipelineConfig;
use crate::data_loader::{load_prices, LoadOptions, PriceSource};
use crate::export::{remove_stale, write_json, write_prices, write_records};
use crate::run_log::{Pipeline, RunLog};

pub const FINANCIAL_CLEAN_FILE: &str = "financial_clean.csv";
pub const FORECAST_FILE: &str = "arima_forecast.csv";
pub const MONTE_CARLO_FILE: &str = "monte_carlo_results.csv";
pub const MONTE_CARLO_PATHS_FILE: &str = "monte_carlo_paths.csv";
pub const FINANCIAL_SUMMARY_FILE: &str = "financial_summary.json";

const FORECAST_HEADERS: [&str; 7] = [
    "ticker", "date", "forecast", "lower_80", "upper_80", "lower_95", "upper_95",
];
const MONTE_CARLO_HEADERS: [&str; 2] = ["final_value", "return_pct"];
const PATH_HEADERS: [&str; 3] = ["path", "month", "value"];

/// Everything the financial pipeline produced.
#[derive(Debug, Clone)]
pub struct FinancialOutcome {
    pub source: PriceSource,
    pub dataset_hash: String,
    pub prices: PriceMatrix,
    pub forecast: ForecastRun,
    pub risk: std::result::Result<(ReturnStatistics, SimulationResult), String>,
    pub diagnostics: Vec<Diagnostic>,
    pub files: Vec<PathBuf>,
}

// ─── Summary JSON ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct FinancialSummary<'a> {
    data: DataSummary<'a>,
    forecasts: Vec<TickerSummary<'a>>,
    forecast_returns: &'a [ForecastReturn],
    risk: Option<RiskSummary<'a>>,
    risk_error: Option<&'a str>,
    warnings: usize,
    errors: usize,
}

#[derive(Debug, Serialize)]
struct DataSummary<'a> {
    source: &'a PriceSource,
    dataset_hash: &'a str,
    tickers: &'a [String],
    rows: usize,
    first_date: Option<NaiveDate>,
    last_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
struct TickerSummary<'a> {
    ticker: &'a str,
    #[serde(flatten)]
    outcome: TickerStatus<'a>,
}

/// Ticker outcome without the forecast records, which live in the CSV.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum TickerStatus<'a> {
    Forecast {
        order: String,
        with_constant: bool,
        aic: f64,
        adf_statistic: Option<f64>,
        adf_p_value: f64,
        differencing: usize,
    },
    Skipped {
        reason: &'a SkipReason,
    },
}

#[derive(Debug, Serialize)]
struct RiskSummary<'a> {
    metrics: &'a RiskMetrics,
    tickers: &'a [String],
    weights: &'a [f64],
    mean_returns: &'a [f64],
    correlation: &'a [Vec<f64>],
    return_observations: usize,
    n_simulations: usize,
    horizon_months: usize,
    seed: u64,
}

#[derive(Debug, Serialize)]
struct PathPoint {
    path: usize,
    month: usize,
    value: f64,
}

// ─── Pipeline ────────────────────────────────────────────────────────

/// Run the financial pipeline and append its diagnostics to `log`.
///
/// `provider` is ignored when the configuration is offline. `as_of` fixes the
/// end of the history window.
pub fn run_financial(
    config: &PipelineConfig,
    provider: Option<&dyn PriceProvider>,
    as_of: NaiveDate,
    opts: LoadOptions,
    log: &RunLog,
) -> Result<FinancialOutcome> {
    let fin = &config.financial;
    let provider = if fin.offline { None } else { provider };
    info!(pipeline = "financial", tickers = ?fin.tickers, offline = provider.is_none(), "starting");

    let cache = PriceCache::new(config.paths.price_cache());
    let loaded = load_prices(&cache, provider, &fin.acquisition_request(as_of), opts);
    let mut diags = loaded.diagnostics;
    let prices = loaded.matrix;
    let mut files = Vec::new();

    if let (Some(first), Some(last)) = (prices.dates().first(), prices.last_date()) {
        diags.push(Diagnostic::qa(format!(
            "Prices: {} rows x {} tickers, {first} to {last}",
            prices.len(),
            prices.tickers().len()
        )));
    }

    let clean_path = config.paths.output(FINANCIAL_CLEAN_FILE);
    write_prices(&clean_path, &prices)?;
    files.push(clean_path);

    // Forecasts
    let forecast = run_forecasts(&prices, &ForecastConfig::default());
    diags.extend(forecast.diagnostics.iter().cloned());
    let forecast_path = config.paths.output(FORECAST_FILE);
    write_records(&forecast_path, &FORECAST_HEADERS, &forecast.records())?;
    files.push(forecast_path);

    // Monte Carlo
    let risk = match run_monte_carlo(&prices, &fin.monte_carlo()) {
        Ok((stats, sim)) => {
            diags.push(Diagnostic::ok(sim.metrics.summary_line()));
            diags.push(Diagnostic::qa(format!(
                "Monte Carlo: {} trajectories, {} paths kept",
                sim.finals.len(),
                sim.paths.len()
            )));

            let results_path = config.paths.output(MONTE_CARLO_FILE);
            let outcomes: Vec<_> = sim.outcomes().collect();
            write_records(&results_path, &MONTE_CARLO_HEADERS, &outcomes)?;
            files.push(results_path);

            let paths_path = config.paths.output(MONTE_CARLO_PATHS_FILE);
            write_records(&paths_path, &PATH_HEADERS, &path_points(&sim))?;
            files.push(paths_path);

            Ok((stats, sim))
        }
        Err(e) => {
            error!(pipeline = "financial", error = %e, "Monte Carlo failed");
            diags.push(Diagnostic::error(format!("Monte Carlo failed: {e}")));
            // results from an earlier run must not pass for this one
            for name in [MONTE_CARLO_FILE, MONTE_CARLO_PATHS_FILE] {
                if remove_stale(&config.paths.output(name))? {
                    diags.push(Diagnostic::warn(format!("Removed stale {name}")));
                }
            }
            Err(e.to_string())
        }
    };

    let summary_path = config.paths.output(FINANCIAL_SUMMARY_FILE);
    let summary = summarize(&loaded.source, &loaded.dataset_hash, &prices, &forecast, &risk, &diags);
    write_json(&summary_path, &summary)?;
    files.push(summary_path);

    diags.push(Diagnostic::ok(format!(
        "Financial pipeline complete: {} files written to {}",
        files.len(),
        config.paths.output_dir.display()
    )));
    log.append(Pipeline::Financial, &diags)
        .with_context(|| format!("append run log {}", log.path().display()))?;

    Ok(FinancialOutcome {
        source: loaded.source,
        dataset_hash: loaded.dataset_hash,
        prices,
        forecast,
        risk,
        diagnostics: diags,
        files,
    })
}

fn path_points(sim: &SimulationResult) -> Vec<PathPoint> {
    sim.paths
        .iter()
        .enumerate()
        .flat_map(|(p, values)| {
            values.iter().enumerate().map(move |(month, &value)| PathPoint {
                path: p,
                month,
                value,
            })
        })
        .collect()
}

fn summarize<'a>(
    source: &'a PriceSource,
    dataset_hash: &'a str,
    prices: &'a PriceMatrix,
    forecast: &'a ForecastRun,
    risk: &'a std::result::Result<(ReturnStatistics, SimulationResult), String>,
    diags: &[Diagnostic],
) -> FinancialSummary<'a> {
    let forecasts = forecast
        .tickers
        .iter()
        .map(|t| TickerSummary {
            ticker: &t.ticker,
            outcome: match &t.outcome {
                TickerOutcome::Forecast {
                    adf,
                    order,
                    with_constant,
                    aic,
                    ..
                } => TickerStatus::Forecast {
                    order: order.to_string(),
                    with_constant: *with_constant,
                    aic: *aic,
                    adf_statistic: adf.statistic,
                    adf_p_value: adf.p_value,
                    differencing: adf.differencing_order(),
                },
                TickerOutcome::Skipped(reason) => TickerStatus::Skipped { reason },
            },
        })
        .collect();

    let (risk_summary, risk_error) = match risk {
        Ok((stats, sim)) => (
            Some(RiskSummary {
                metrics: &sim.metrics,
                tickers: &sim.tickers,
                weights: &sim.weights,
                mean_returns: &stats.mean,
                correlation: &stats.correlation,
                return_observations: stats.observations,
                n_simulations: sim.config.n_simulations,
                horizon_months: sim.config.horizon_months,
                seed: sim.config.seed,
            }),
            None,
        ),
        Err(e) => (None, Some(e.as_str())),
    };

    FinancialSummary {
        data: DataSummary {
            source,
            dataset_hash,
            tickers: prices.tickers(),
            rows: prices.len(),
            first_date: prices.dates().first().copied(),
            last_date: prices.last_date(),
        },
        forecasts,
        forecast_returns: &forecast.returns,
        risk: risk_summary,
        risk_error,
        warnings: diagnostics::count(diags, Severity::Warn),
        errors: diagnostics::count(diags, Severity::Error),
    }
}
