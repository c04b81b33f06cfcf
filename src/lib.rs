//! Coverage Metrics - Cobertura coverage aggregation
//!
//! A library for turning line-coverage reports into reportable numbers:
//! - Tolerant Cobertura XML parsing
//! - Merging of overlapping reports, line by line
//! - Glob-scoped coverage percentages
//! - DataDog gauge submission

pub mod config;
pub mod coverage;
pub mod datadog;

pub use config::Config;
pub use coverage::{CoverageData, CoverageParseError, CoverageSummary, FileCoverage, LineRecord};
pub use datadog::{DatadogClient, Gauge};
