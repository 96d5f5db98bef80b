//! Monthly price data: retrieval, synthesis, caching.

pub mod acquire;
pub mod cache;
pub mod calendar;
pub mod matrix;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use acquire::{acquire_prices, retrieve_all, Acquisition, AcquisitionRequest, MIN_RETRIEVED_ROWS};
pub use cache::PriceCache;
pub use matrix::PriceMatrix;
pub use provider::{DataError, MonthlyClose, PriceProvider};
pub use synthetic::{synthetic_matrix, synthetic_series, SYNTHETIC_PERIODS};
pub use yahoo::YahooProvider;
