//! Structured stage diagnostics.
//!
//! Engines never write log files. Each stage returns the diagnostics it
//! produced next to its result; the runner timestamps them, forwards them to
//! `tracing`, and renders the human-readable QA log.

use serde::{Deserialize, Serialize};

/// Outcome class of a diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Ok,
    Warn,
    Error,
    /// Data quality summary (row counts, distributions, nulls).
    Qa,
}

impl Severity {
    /// Tag used in the rendered log, e.g. `[WARN]`.
    pub fn tag(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Qa => "QA",
        }
    }
}

/// One diagnostic emitted by a pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(Severity::Ok, message)
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn qa(message: impl Into<String>) -> Self {
        Self::new(Severity::Qa, message)
    }

    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
        }
    }
}

/// Count diagnostics at the given severity.
pub fn count(diagnostics: &[Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}
