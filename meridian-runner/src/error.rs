use thiserror::Error;

use meridian_core::hr::HrError;

use crate::config::ConfigError;

/// Errors that stop a pipeline before it produces outputs.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("cannot load HR dataset {path}: {source}")]
    HrSource {
        path: String,
        #[source]
        source: HrError,
    },
}
