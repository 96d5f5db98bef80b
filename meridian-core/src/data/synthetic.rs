//! Deterministic synthetic monthly prices.
//!
//! Used when retrieval fails. Each ticker's log returns combine a linear
//! trend, a low-frequency sinusoid and Gaussian noise, exponentiated from a
//! per-ticker base price. Seeds come from the `RngHierarchy`, so a ticker's
//! series is reproducible and independent of the rest of the ticker list.

use chrono::NaiveDate;
use std::f64::consts::PI;

use super::calendar::months_ending;
use super::matrix::PriceMatrix;
use crate::rng::{standard_normal, RngHierarchy};

/// Default number of synthetic months (five years).
pub const SYNTHETIC_PERIODS: usize = 60;

const TREND: f64 = 0.008;
const SEASONAL_AMPLITUDE: f64 = 0.05;
const NOISE_STD: f64 = 0.04;

/// Starting price for a ticker's synthetic series.
pub fn base_price(ticker: &str) -> f64 {
    match ticker {
        "AAPL" => 150.0,
        "MSFT" => 280.0,
        "GOOGL" => 130.0,
        "AMZN" => 170.0,
        _ => 100.0,
    }
}

/// Synthetic close series of `periods` months for one ticker.
pub fn synthetic_series(ticker: &str, periods: usize, rng: &RngHierarchy) -> Vec<f64> {
    let mut r = rng.rng_for("synthetic", ticker);
    let base = base_price(ticker);
    let step = if periods > 1 {
        4.0 * PI / (periods - 1) as f64
    } else {
        0.0
    };

    let mut log_level = 0.0;
    (0..periods)
        .map(|i| {
            let seasonal = SEASONAL_AMPLITUDE * (step * i as f64).sin();
            let noise = NOISE_STD * standard_normal(&mut r);
            log_level += TREND + seasonal / periods as f64 + noise;
            base * log_level.exp()
        })
        .collect()
}

/// Synthetic matrix for all tickers, `periods` month starts ending at `as_of`.
pub fn synthetic_matrix(
    tickers: &[String],
    periods: usize,
    as_of: NaiveDate,
    rng: &RngHierarchy,
) -> PriceMatrix {
    let dates = months_ending(as_of, periods);
    let columns = tickers
        .iter()
        .map(|t| synthetic_series(t, periods, rng))
        .collect();
    PriceMatrix::new(dates, tickers.to_vec(), columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tickers() -> Vec<String> {
        ["AAPL", "MSFT", "GOOGL", "AMZN"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn synthetic_is_reproducible() {
        let rng = RngHierarchy::new(42);
        assert_eq!(
            synthetic_series("AAPL", 60, &rng),
            synthetic_series("AAPL", 60, &rng)
        );
    }

    #[test]
    fn series_independent_of_ticker_order() {
        let rng = RngHierarchy::new(42);
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let forward = synthetic_matrix(&tickers(), 60, as_of, &rng);
        let mut reversed_tickers = tickers();
        reversed_tickers.reverse();
        let reversed = synthetic_matrix(&reversed_tickers, 60, as_of, &rng);
        assert_eq!(forward.series("MSFT"), reversed.series("MSFT"));
    }

    #[test]
    fn matrix_shape_and_dates() {
        let rng = RngHierarchy::new(42);
        let as_of = NaiveDate::from_ymd_opt(2025, 6, 15).unwrap();
        let m = synthetic_matrix(&tickers(), 60, as_of, &rng);
        assert_eq!(m.len(), 60);
        assert_eq!(m.tickers().len(), 4);
        assert_eq!(m.last_date(), NaiveDate::from_ymd_opt(2025, 6, 1));
        assert_eq!(m.dates()[0], NaiveDate::from_ymd_opt(2020, 7, 1).unwrap());
    }

    #[test]
    fn prices_are_positive_and_near_base() {
        let rng = RngHierarchy::new(42);
        let series = synthetic_series("MSFT", 60, &rng);
        assert!(series.iter().all(|p| *p > 0.0));
        // first step is a single small log return away from the base
        assert!((series[0] / 280.0 - 1.0).abs() < 0.25);
    }
}
