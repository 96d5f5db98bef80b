//! Meridian Core — price data, forecasting, risk simulation, HR statistics.
//!
//! This crate contains the quantitative engines:
//! - Monthly price acquisition with deterministic synthetic fallback and CSV cache
//! - ADF stationarity test and stepwise ARIMA forecasting
//! - Correlated Monte Carlo portfolio simulation with VaR/CVaR
//! - HR attrition, pay gap, diversity and attrition classifier
//! - Statistics and linear algebra primitives shared by the engines
//!
//! Engines never touch log files: each returns structured diagnostics next
//! to its result.

pub mod data;
pub mod diagnostics;
pub mod forecast;
pub mod hr;
pub mod linalg;
pub mod risk;
pub mod rng;
pub mod stats;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: engine inputs and outputs are Send + Sync so the
    /// financial and HR pipelines can run on separate threads.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Data
        require_send::<data::PriceMatrix>();
        require_sync::<data::PriceMatrix>();
        require_send::<data::Acquisition>();
        require_sync::<data::Acquisition>();
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();

        // Forecast
        require_send::<forecast::ForecastRun>();
        require_sync::<forecast::ForecastRun>();
        require_send::<forecast::ArimaModel>();
        require_sync::<forecast::ArimaModel>();

        // Risk
        require_send::<risk::SimulationResult>();
        require_sync::<risk::SimulationResult>();
        require_send::<risk::ReturnStatistics>();
        require_sync::<risk::ReturnStatistics>();

        // HR
        require_send::<hr::EmployeeTable>();
        require_sync::<hr::EmployeeTable>();
        require_send::<hr::HrReport>();
        require_sync::<hr::HrReport>();

        // Diagnostics
        require_send::<diagnostics::Diagnostic>();
        require_sync::<diagnostics::Diagnostic>();
    }
}
