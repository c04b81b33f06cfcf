//! Coverage module
//!
//! Provides:
//! - Cobertura XML parsing into per-line records
//! - A merged per-file line table fed by any number of reports
//! - Glob-scoped coverage percentages

mod cobertura;
mod pattern;

pub use cobertura::*;
pub use pattern::*;

use std::collections::BTreeMap;

/// Lines seen for one source file, keyed by line number.
///
/// A line is covered once any report has recorded a hit for it, and stays
/// covered no matter what later reports say.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileCoverage {
    lines: BTreeMap<u64, bool>,
}

impl FileCoverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one line record into the table.
    pub fn record(&mut self, line_number: u64, hits: u64) {
        let covered = self.lines.entry(line_number).or_insert(false);
        *covered |= hits > 0;
    }

    pub fn is_covered(&self, line_number: u64) -> Option<bool> {
        self.lines.get(&line_number).copied()
    }

    pub fn lines_total(&self) -> u32 {
        self.lines.len() as u32
    }

    pub fn lines_covered(&self) -> u32 {
        self.lines.values().filter(|covered| **covered).count() as u32
    }
}

/// Totals behind a single `coverage` answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverageSummary {
    pub files: usize,
    pub lines_covered: u32,
    pub lines_total: u32,
}

impl CoverageSummary {
    pub fn percentage(&self) -> f64 {
        (self.lines_covered as f64 / self.lines_total as f64) * 100.0
    }
}

/// Coverage aggregated across every report added so far
#[derive(Debug, Clone, Default)]
pub struct CoverageData {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a Cobertura report and merge its lines into the table.
    ///
    /// The report is parsed in full before anything is merged, so a
    /// malformed document leaves the table untouched.
    pub fn add_report(&mut self, xml: &str) -> Result<(), CoverageParseError> {
        let records = parse_cobertura_string(xml)?;

        for (path, record) in records {
            self.files
                .entry(path)
                .or_default()
                .record(record.line_number, record.hits);
        }

        Ok(())
    }

    /// Percentage of covered lines across files matching `pattern`.
    ///
    /// Returns `None` when nothing matches or the matched files have no lines.
    pub fn coverage(&self, pattern: &str) -> Option<f64> {
        self.summary(pattern).map(|summary| summary.percentage())
    }

    /// Line totals across files matching `pattern`, with the same `None`
    /// rules as [`CoverageData::coverage`].
    pub fn summary(&self, pattern: &str) -> Option<CoverageSummary> {
        let pattern = WildcardPattern::new(pattern).ok()?;

        let mut summary = CoverageSummary {
            files: 0,
            lines_covered: 0,
            lines_total: 0,
        };

        for file in self
            .files
            .iter()
            .filter(|(path, _)| pattern.matches(path))
            .map(|(_, file)| file)
        {
            summary.files += 1;
            summary.lines_covered += file.lines_covered();
            summary.lines_total += file.lines_total();
        }

        if summary.lines_total == 0 {
            return None;
        }

        Some(summary)
    }

    pub fn file(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Files in path order
    pub fn files(&self) -> impl Iterator<Item = (&str, &FileCoverage)> {
        self.files.iter().map(|(path, file)| (path.as_str(), file))
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
