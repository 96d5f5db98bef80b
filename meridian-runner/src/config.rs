//! Pipeline configuration loaded from `meridian.toml`.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. The loaded value is validated once and then passed by
//! reference into the pipeline entry points; nothing mutates it afterwards.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use meridian_core::data::AcquisitionRequest;
use meridian_core::hr::{ClassifierConfig, EmployeeFilter, HrConfig, PayGapConfig};
use meridian_core::risk::MonteCarloConfig;
use meridian_core::stats::TTestKind;

/// Price cache file name inside `data_dir`.
pub const PRICE_CACHE_FILE: &str = "financial_data.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub financial: FinancialConfig,
    pub hr: HrSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Append-only QA log.
    pub log_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
            log_file: PathBuf::from("output/financial_hr_qa_log.txt"),
        }
    }
}

impl PathsConfig {
    pub fn price_cache(&self) -> PathBuf {
        self.data_dir.join(PRICE_CACHE_FILE)
    }

    pub fn output(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }
}

/// Financial pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinancialConfig {
    pub tickers: Vec<String>,
    pub history_years: u32,
    pub n_simulations: usize,
    pub horizon_months: usize,
    /// Clamped to `n_simulations` by [`PipelineConfig::validate`].
    pub path_sample: usize,
    pub seed: u64,
    /// Never contact the price source; synthesize when the cache is unusable.
    pub offline: bool,
}

impl Default for FinancialConfig {
    fn default() -> Self {
        let mc = MonteCarloConfig::default();
        Self {
            tickers: ["AAPL", "MSFT", "GOOGL", "AMZN"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            history_years: 5,
            n_simulations: mc.n_simulations,
            horizon_months: mc.horizon_months,
            path_sample: mc.path_sample,
            seed: mc.seed,
            offline: false,
        }
    }
}

impl FinancialConfig {
    pub fn monte_carlo(&self) -> MonteCarloConfig {
        MonteCarloConfig {
            n_simulations: self.n_simulations,
            horizon_months: self.horizon_months,
            path_sample: self.path_sample,
            seed: self.seed,
        }
    }

    pub fn acquisition_request(&self, as_of: NaiveDate) -> AcquisitionRequest {
        AcquisitionRequest {
            history_years: self.history_years,
            seed: self.seed,
            ..AcquisitionRequest::new(self.tickers.clone(), as_of)
        }
    }
}

/// HR pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrSettings {
    pub source: PathBuf,
    pub group_a: String,
    pub group_b: String,
    pub significance: f64,
    pub min_department_group: usize,
    pub t_test: TTestKind,
    pub accuracy_warning: f64,
    pub seed: u64,
    pub filter: EmployeeFilter,
}

impl Default for HrSettings {
    fn default() -> Self {
        let pay_gap = PayGapConfig::default();
        let classifier = ClassifierConfig::default();
        Self {
            source: PathBuf::from("data/WA_Fn-UseC_-HR-Employee-Attrition.csv"),
            group_a: pay_gap.group_a,
            group_b: pay_gap.group_b,
            significance: pay_gap.significance,
            min_department_group: pay_gap.min_department_group,
            t_test: pay_gap.t_test,
            accuracy_warning: classifier.accuracy_warning,
            seed: classifier.seed,
            filter: EmployeeFilter::default(),
        }
    }
}

impl HrSettings {
    /// Engine settings derived from this section.
    pub fn engine_config(&self) -> HrConfig {
        HrConfig {
            pay_gap: PayGapConfig {
                group_a: self.group_a.clone(),
                group_b: self.group_b.clone(),
                significance: self.significance,
                min_department_group: self.min_department_group,
                t_test: self.t_test,
            },
            classifier: ClassifierConfig {
                accuracy_warning: self.accuracy_warning,
                seed: self.seed,
                ..ClassifierConfig::default()
            },
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub n_simulations: Option<usize>,
    pub offline: bool,
    pub hr_source: Option<PathBuf>,
    pub departments: Vec<String>,
    pub genders: Vec<String>,
}

impl PipelineConfig {
    /// Load and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()
    }

    /// Load `path` when it exists, otherwise start from defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Self::default().validate()
        }
    }

    /// Check invariants. `path_sample` above `n_simulations` is clamped.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        let f = &mut self.financial;
        if f.tickers.is_empty() {
            return Err(ConfigError::Validation("financial.tickers is empty".into()));
        }
        if f.n_simulations == 0 {
            return Err(ConfigError::Validation(
                "financial.n_simulations must be positive".into(),
            ));
        }
        if f.horizon_months == 0 {
            return Err(ConfigError::Validation(
                "financial.horizon_months must be positive".into(),
            ));
        }
        if f.history_years == 0 {
            return Err(ConfigError::Validation(
                "financial.history_years must be positive".into(),
            ));
        }
        f.path_sample = f.path_sample.min(f.n_simulations);

        let s = self.hr.significance;
        if !(s > 0.0 && s < 1.0) {
            return Err(ConfigError::Validation(format!(
                "hr.significance must be in (0, 1), got {s}"
            )));
        }
        if self.hr.group_a == self.hr.group_b {
            return Err(ConfigError::Validation(format!(
                "hr.group_a and hr.group_b are both '{}'",
                self.hr.group_a
            )));
        }
        Ok(self)
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Result<Self, ConfigError> {
        if let Some(n) = overrides.n_simulations {
            self.financial.n_simulations = n;
            // keep the configured sample unless it no longer fits
            self.financial.path_sample = self.financial.path_sample.min(n);
        }
        if overrides.offline {
            self.financial.offline = true;
        }
        if let Some(source) = &overrides.hr_source {
            self.hr.source = source.clone();
        }
        if !overrides.departments.is_empty() {
            self.hr.filter.departments = overrides.departments.clone();
        }
        if !overrides.genders.is_empty() {
            self.hr.filter.genders = overrides.genders.clone();
        }
        self.validate()
    }
}
