//! Meridian Runner — pipeline orchestration, configuration, exports, run log.
//!
//! This crate builds on `meridian-core` to provide:
//! - TOML configuration with defaults, validation and CLI overrides
//! - Price loading with cache → retrieval → synthetic fallback
//! - The financial pipeline (forecasts, Monte Carlo, CSV/JSON exports)
//! - The HR pipeline (QA, filter, analyses, CSV/JSON exports)
//! - The append-only QA run log rendered from stage diagnostics

pub mod config;
pub mod data_loader;
pub mod error;
pub mod export;
pub mod financial;
pub mod hr;
pub mod run_log;

pub use config::{ConfigError, ConfigOverrides, PipelineConfig};
pub use data_loader::{dataset_hash, load_prices, LoadOptions, LoadedPrices, PriceSource};
pub use error::RunError;
pub use financial::{run_financial, FinancialOutcome};
pub use hr::{run_hr, HrOutcome};
pub use run_log::{Pipeline, RunLog};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn outcomes_are_send() {
        // `all` runs both pipelines on separate threads
        assert_send::<FinancialOutcome>();
        assert_send::<HrOutcome>();
        assert_send::<anyhow::Error>();
    }

    #[test]
    fn run_log_is_send_sync() {
        assert_send::<RunLog>();
        assert_sync::<RunLog>();
    }
}
