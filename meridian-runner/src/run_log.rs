//! Append-only QA log rendered from pipeline diagnostics.
//!
//! Line format: `[YYYY-MM-DD HH:MM:SS] FINANCIAL | [OK] message`. Each
//! pipeline appends its whole block in one write after it finishes.

use chrono::{Local, NaiveDateTime};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use meridian_core::diagnostics::Diagnostic;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Which pipeline a log block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pipeline {
    Financial,
    Hr,
}

impl Pipeline {
    pub fn label(self) -> &'static str {
        match self {
            Pipeline::Financial => "FINANCIAL",
            Pipeline::Hr => "HR",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append diagnostics stamped with the current local time.
    pub fn append(&self, pipeline: Pipeline, diagnostics: &[Diagnostic]) -> std::io::Result<()> {
        self.append_at(pipeline, diagnostics, Local::now().naive_local())
    }

    pub fn append_at(
        &self,
        pipeline: Pipeline,
        diagnostics: &[Diagnostic],
        at: NaiveDateTime,
    ) -> std::io::Result<()> {
        if diagnostics.is_empty() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let block = render_block(pipeline, diagnostics, at);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        debug!(
            pipeline = pipeline.label(),
            lines = diagnostics.len(),
            path = %self.path.display(),
            "run log appended"
        );
        Ok(())
    }
}

/// Render one line per diagnostic.
pub fn render_block(pipeline: Pipeline, diagnostics: &[Diagnostic], at: NaiveDateTime) -> String {
    let stamp = at.format(TIMESTAMP_FORMAT);
    diagnostics
        .iter()
        .map(|d| {
            format!(
                "[{stamp}] {} | [{}] {}\n",
                pipeline.label(),
                d.severity.tag(),
                d.message
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 4)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap()
    }

    #[test]
    fn renders_fixed_format() {
        let block = render_block(
            Pipeline::Financial,
            &[Diagnostic::ok("loaded"), Diagnostic::warn("short")],
            at(),
        );
        assert_eq!(
            block,
            "[2025-03-04 09:05:07] FINANCIAL | [OK] loaded\n\
             [2025-03-04 09:05:07] FINANCIAL | [WARN] short\n"
        );
    }

    #[test]
    fn appends_never_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("out/log.txt"));
        log.append_at(Pipeline::Financial, &[Diagnostic::ok("one")], at())
            .unwrap();
        log.append_at(Pipeline::Hr, &[Diagnostic::qa("two")], at())
            .unwrap();
        log.append_at(Pipeline::Hr, &[], at()).unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("FINANCIAL | [OK] one"));
        assert!(lines[1].ends_with("HR | [QA] two"));
    }
}
