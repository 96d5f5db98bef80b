//! Price loading for the financial pipeline.
//!
//! Resolution order:
//! 1. Cached matrix, when it exists and covers every configured ticker with
//!    enough rows
//! 2. Retrieval through the provider (skipped in offline mode)
//! 3. Deterministic synthetic series
//!
//! Whatever is acquired in steps 2 or 3 is written back to the cache. The
//! cache is never invalidated automatically; `cache clean` removes it.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use meridian_core::data::{acquire_prices, Acquisition, AcquisitionRequest, PriceCache, PriceMatrix, PriceProvider};
use meridian_core::diagnostics::Diagnostic;

/// Where the loaded matrix came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PriceSource {
    Cache,
    Retrieved,
    Synthetic { reason: String },
}

impl PriceSource {
    pub fn label(&self) -> &'static str {
        match self {
            PriceSource::Cache => "cache",
            PriceSource::Retrieved => "retrieved",
            PriceSource::Synthetic { .. } => "synthetic",
        }
    }
}

/// Options controlling how prices are loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Ignore the cache even if it is usable.
    pub force_refresh: bool,
}

/// Loaded prices with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub matrix: PriceMatrix,
    pub source: PriceSource,
    /// BLAKE3 over dates, tickers and closes.
    pub dataset_hash: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Load the price matrix for `request.tickers`.
///
/// `provider = None` means offline. Never fails: every failure path ends in
/// synthetic data plus a diagnostic.
pub fn load_prices(
    cache: &PriceCache,
    provider: Option<&dyn PriceProvider>,
    request: &AcquisitionRequest,
    opts: LoadOptions,
) -> LoadedPrices {
    let mut diagnostics = Vec::new();

    // Step 1: cache
    if !opts.force_refresh && cache.exists() {
        match usable_cache(cache, request) {
            Ok(matrix) => {
                info!(
                    pipeline = "financial",
                    path = %cache.path().display(),
                    rows = matrix.len(),
                    "using cached prices"
                );
                diagnostics.push(Diagnostic::ok(format!(
                    "Loaded cached prices from {}: {} tickers, {} monthly rows",
                    cache.path().display(),
                    matrix.tickers().len(),
                    matrix.len()
                )));
                return finish(matrix, PriceSource::Cache, diagnostics);
            }
            Err(reason) => {
                warn!(pipeline = "financial", path = %cache.path().display(), %reason, "cache unusable");
                diagnostics.push(Diagnostic::warn(format!(
                    "Cache {} unusable ({reason}), acquiring prices",
                    cache.path().display()
                )));
            }
        }
    }

    // Steps 2 and 3: retrieval with synthetic fallback
    let acquisition = acquire_prices(provider, request);
    diagnostics.push(acquisition.diagnostic());
    let source = match &acquisition {
        Acquisition::Retrieved(_) => PriceSource::Retrieved,
        Acquisition::Synthesized { reason, .. } => PriceSource::Synthetic {
            reason: reason.clone(),
        },
    };
    let matrix = acquisition.into_matrix();

    match cache.write(&matrix) {
        Ok(()) => diagnostics.push(Diagnostic::ok(format!(
            "Prices cached to {}",
            cache.path().display()
        ))),
        Err(e) => {
            warn!(pipeline = "financial", error = %e, "cache write failed");
            diagnostics.push(Diagnostic::warn(format!("Cache write failed: {e}")));
        }
    }

    finish(matrix, source, diagnostics)
}

fn usable_cache(cache: &PriceCache, request: &AcquisitionRequest) -> Result<PriceMatrix, String> {
    let matrix = cache.load().map_err(|e| e.to_string())?;
    let missing: Vec<&str> = request
        .tickers
        .iter()
        .filter(|t| matrix.series(t).is_none())
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(format!("missing tickers {missing:?}"));
    }
    if matrix.len() < request.min_rows {
        return Err(format!("{} rows, need {}", matrix.len(), request.min_rows));
    }
    matrix
        .select(&request.tickers)
        .ok_or_else(|| "ticker selection failed".to_string())
}

fn finish(matrix: PriceMatrix, source: PriceSource, diagnostics: Vec<Diagnostic>) -> LoadedPrices {
    LoadedPrices {
        dataset_hash: dataset_hash(&matrix),
        matrix,
        source,
        diagnostics,
    }
}

/// Deterministic BLAKE3 hash of a price matrix.
pub fn dataset_hash(matrix: &PriceMatrix) -> String {
    let mut hasher = blake3::Hasher::new();
    for date in matrix.dates() {
        hasher.update(date.to_string().as_bytes());
    }
    for (ticker, series) in matrix.iter_series() {
        hasher.update(ticker.as_bytes());
        for close in series {
            hasher.update(&close.to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use meridian_core::data::{DataError, MonthlyClose};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn request(tickers: &[&str]) -> AcquisitionRequest {
        AcquisitionRequest::new(tickers.iter().map(|s| s.to_string()).collect(), as_of())
    }

    /// Provider that counts calls and returns a fixed ramp per ticker.
    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl PriceProvider for CountingProvider {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch_monthly(
            &self,
            ticker: &str,
            start: NaiveDate,
            _end: NaiveDate,
        ) -> Result<Vec<MonthlyClose>, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(DataError::SymbolNotFound {
                    symbol: ticker.to_string(),
                });
            }
            Ok((0..24)
                .map(|i| MonthlyClose {
                    date: meridian_core::data::calendar::add_months(start, i),
                    close: 100.0 + i as f64,
                })
                .collect())
        }
    }

    #[test]
    fn offline_without_cache_synthesizes_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        let loaded = load_prices(&cache, None, &request(&["AAPL", "MSFT"]), LoadOptions::default());

        assert_eq!(
            loaded.source,
            PriceSource::Synthetic {
                reason: "offline mode".into()
            }
        );
        assert_eq!(loaded.matrix.len(), 60);
        assert!(cache.exists());
    }

    #[test]
    fn second_load_hits_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        let req = request(&["AAPL", "MSFT"]);
        let first = load_prices(&cache, None, &req, LoadOptions::default());

        let provider = CountingProvider::new(false);
        let second = load_prices(&cache, Some(&provider), &req, LoadOptions::default());
        assert_eq!(second.source, PriceSource::Cache);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.matrix.tickers(), first.matrix.tickers());
        assert_eq!(second.matrix.len(), first.matrix.len());
    }

    #[test]
    fn cache_missing_ticker_triggers_retrieval() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        load_prices(&cache, None, &request(&["AAPL"]), LoadOptions::default());

        let provider = CountingProvider::new(false);
        let loaded = load_prices(
            &cache,
            Some(&provider),
            &request(&["AAPL", "MSFT"]),
            LoadOptions::default(),
        );
        assert_eq!(loaded.source, PriceSource::Retrieved);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert!(loaded.diagnostics[0].message.contains("missing tickers"));
    }

    #[test]
    fn failed_retrieval_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        let provider = CountingProvider::new(true);
        let loaded = load_prices(
            &cache,
            Some(&provider),
            &request(&["AAPL"]),
            LoadOptions { force_refresh: true },
        );
        assert_eq!(loaded.source.label(), "synthetic");
        assert!(!loaded.matrix.is_empty());
    }

    #[test]
    fn hash_is_deterministic_and_content_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PriceCache::new(dir.path().join("prices.csv"));
        let a = load_prices(&cache, None, &request(&["AAPL"]), LoadOptions { force_refresh: true });
        let b = load_prices(&cache, None, &request(&["AAPL"]), LoadOptions { force_refresh: true });
        let c = load_prices(&cache, None, &request(&["MSFT"]), LoadOptions { force_refresh: true });
        assert_eq!(a.dataset_hash, b.dataset_hash);
        assert_ne!(a.dataset_hash, c.dataset_hash);
    }
}
