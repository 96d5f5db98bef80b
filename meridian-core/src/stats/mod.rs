//! Statistics primitives shared by the forecast, risk and HR engines.
//!
//! Implemented from first principles, no numeric crates:
//! - Descriptive statistics (mean, variance, median, linear-interpolated percentiles)
//! - Distribution functions (ln Gamma, incomplete beta, Student t, standard normal)
//! - Rank and product-moment correlation with significance
//! - Two-sample t-tests (Student pooled and Welch)

pub mod correlation;
pub mod descriptive;
pub mod distributions;
pub mod hypothesis;

pub use correlation::{pearson, rank_average, spearman, CorrelationTest};
pub use descriptive::{mean, median, percentile, round_to, std_dev, variance};
pub use distributions::{normal_cdf, normal_quantile, t_cdf};
pub use hypothesis::{two_sample_t_test, TTestKind, TTestResult};

use thiserror::Error;

/// Errors from numerical routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("singular system: design matrix is rank deficient")]
    Singular,

    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("non-finite value in input")]
    NonFinite,
}
