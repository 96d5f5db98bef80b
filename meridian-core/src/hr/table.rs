//! Employee table: CSV loading, schema QA, derived attrition flag, filters.
//!
//! The table keeps every source column as text so it can be written back
//! unchanged next to the derived `Attrition_num` column. Numeric views are
//! parsed on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use super::HrError;
use crate::diagnostics::Diagnostic;

pub const ATTRITION: &str = "Attrition";
pub const ATTRITION_NUM: &str = "Attrition_num";
pub const DEPARTMENT: &str = "Department";
pub const GENDER: &str = "Gender";
pub const MONTHLY_INCOME: &str = "MonthlyIncome";
pub const OVERTIME: &str = "OverTime";

/// Columns the analyses expect. Missing ones are reported, not fatal.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "Attrition",
    "Age",
    "Department",
    "Gender",
    "JobLevel",
    "MonthlyIncome",
    "OverTime",
    "TotalWorkingYears",
    "YearsAtCompany",
    "JobSatisfaction",
    "EnvironmentSatisfaction",
];

const NULL_TOKENS: [&str; 5] = ["", "NA", "NaN", "nan", "null"];

fn is_null(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell.trim())
}

/// Row-major employee records with a derived 0/1 attrition flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// `1` where `Attrition == "Yes"`, aligned with `rows`. `None` when the
    /// source has no `Attrition` column.
    attrition: Option<Vec<u8>>,
}

impl EmployeeTable {
    /// Build from headers and rows, deriving the attrition flag.
    ///
    /// A pre-existing `Attrition_num` column is dropped and re-derived; it is
    /// never fabricated when `Attrition` itself is absent. Short rows are padded with empty cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let keep: Vec<usize> = (0..headers.len())
            .filter(|&i| headers[i] != ATTRITION_NUM)
            .collect();
        let width = headers.len();
        let headers: Vec<String> = keep.iter().map(|&i| headers[i].clone()).collect();
        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                keep.iter().map(|&i| std::mem::take(&mut row[i])).collect()
            })
            .collect();

        let attrition = headers
            .iter()
            .position(|h| h == ATTRITION)
            .map(|idx| rows.iter().map(|r| u8::from(r[idx].trim() == "Yes")).collect());
        Self {
            headers,
            rows,
            attrition,
        }
    }

    /// Parse CSV from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, HrError> {
        let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        let headers = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self::new(headers, rows))
    }

    /// Load a CSV file.
    pub fn from_path(path: &Path) -> Result<Self, HrError> {
        let file = std::fs::File::open(path).map_err(|e| HrError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_reader(file)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Derived attrition flag per row, if the source has an `Attrition` column.
    pub fn attrition(&self) -> Option<&[u8]> {
        self.attrition.as_deref()
    }

    /// Attrition flag as `f64` for correlation and regression.
    pub fn attrition_f64(&self) -> Option<Vec<f64>> {
        self.attrition()
            .map(|flags| flags.iter().map(|&a| f64::from(a)).collect())
    }

    /// Raw text of a column.
    pub fn text_column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| r[idx].trim()).collect())
    }

    /// Numeric view of a column; null or unparseable cells are NaN.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(
            self.rows
                .iter()
                .map(|r| {
                    let cell = r[idx].trim();
                    if is_null(cell) {
                        f64::NAN
                    } else {
                        cell.parse().unwrap_or(f64::NAN)
                    }
                })
                .collect(),
        )
    }

    /// Total null cells across all source columns.
    pub fn null_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|c| is_null(c))
            .count()
    }

    /// Counts of each raw `Attrition` value, e.g. `{"No": 1233, "Yes": 237}`.
    pub fn attrition_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        if let Some(values) = self.text_column(ATTRITION) {
            for v in values {
                *counts.entry(v.to_string()).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Expected columns that are absent.
    pub fn missing_columns(&self) -> Vec<&'static str> {
        REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !self.has_column(c))
            .collect()
    }

    /// Load-time QA: shape, nulls, attrition distribution, missing columns.
    pub fn quality_report(&self) -> Vec<Diagnostic> {
        let mut diags = vec![
            Diagnostic::ok(format!(
                "Dataset loaded: {} rows x {} columns",
                self.len(),
                self.headers.len()
            )),
            Diagnostic::qa(format!("Total nulls: {}", self.null_count())),
            Diagnostic::qa(format!("Attrition distribution: {:?}", self.attrition_counts())),
        ];
        let missing = self.missing_columns();
        if !missing.is_empty() {
            diags.push(Diagnostic::warn(format!("Missing columns: {missing:?}")));
        }
        diags
    }

    /// Rows matching the filter.
    pub fn filter(&self, filter: &EmployeeFilter) -> Self {
        if filter.is_empty() {
            return self.clone();
        }
        let dept = self.column_index(DEPARTMENT);
        let gender = self.column_index(GENDER);
        let keep: Vec<usize> = (0..self.rows.len())
            .filter(|&i| {
                let row = &self.rows[i];
                filter.matches(
                    dept.map(|d| row[d].trim()),
                    gender.map(|g| row[g].trim()),
                )
            })
            .collect();
        Self {
            headers: self.headers.clone(),
            rows: keep.iter().map(|&i| self.rows[i].clone()).collect(),
            attrition: self
                .attrition
                .as_ref()
                .map(|flags| keep.iter().map(|&i| flags[i]).collect()),
        }
    }

    /// Source headers followed by `Attrition_num` when the flag exists.
    pub fn export_headers(&self) -> Vec<String> {
        let mut h = self.headers.clone();
        if self.attrition.is_some() {
            h.push(ATTRITION_NUM.to_string());
        }
        h
    }

    /// Source cells followed by the attrition flag (if any), row by row.
    pub fn export_rows(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().enumerate().map(|(i, row)| {
            let mut out = row.clone();
            if let Some(flags) = &self.attrition {
                out.push(flags[i].to_string());
            }
            out
        })
    }
}

/// Department and gender filter. Empty lists match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmployeeFilter {
    pub departments: Vec<String>,
    pub genders: Vec<String>,
}

impl EmployeeFilter {
    pub fn is_empty(&self) -> bool {
        self.departments.is_empty() && self.genders.is_empty()
    }

    /// A missing column cannot satisfy a non-empty list for that column.
    pub fn matches(&self, department: Option<&str>, gender: Option<&str>) -> bool {
        let ok = |allowed: &[String], value: Option<&str>| {
            allowed.is_empty() || value.is_some_and(|v| allowed.iter().any(|a| a == v))
        };
        ok(&self.departments, department) && ok(&self.genders, gender)
    }
}
