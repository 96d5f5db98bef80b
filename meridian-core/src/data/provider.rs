//! Price provider trait and structured error types.
//!
//! The `PriceProvider` trait abstracts over retrieval sources so the Yahoo
//! client can be swapped for a mock in tests. Caching and synthetic fallback
//! sit above this trait; providers know nothing about either.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One monthly close observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyClose {
    /// First day of the month the observation belongs to.
    pub date: NaiveDate,
    pub close: f64,
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("insufficient data: {rows} rows < minimum {min_rows}")]
    InsufficientRows { rows: usize, min_rows: usize },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("data error: {0}")]
    Other(String),
}

/// Trait for monthly price retrieval (Yahoo Finance, mocks).
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch monthly closes for a ticker over a date range, ascending by date.
    fn fetch_monthly(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<MonthlyClose>, DataError>;
}
