//! Tail reader for the Grinder KPI log.
//!
//! The tool appends one CSV row per finished test run. [`ResultLogReader`]
//! follows the file as it grows and turns every complete data row into a
//! [`Sample`]; rows that cannot be interpreted are skipped.
mod header;
mod reader;


use std::time::Duration;

pub use header::ColumnIndex;
pub use reader::{ResultLogReader, Samples};

/// Message attached to samples whose `Errors` column is non-zero.
pub const GRINDER_ERROR_MESSAGE: &str = "There were some errors in Grinder test";

/// One normalized measurement taken from a KPI log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Start of the test run, whole seconds since the epoch.
    pub timestamp: u64,
    pub label: String,
    /// Active workers; the KPI log does not record it.
    pub concurrency: Option<u64>,
    pub response_time: Duration,
    /// Host resolution plus connection establishment.
    pub connect_time: Duration,
    /// Time to first byte.
    pub latency: Duration,
    pub response_code: String,
    pub error: Option<String>,
    pub extra: String,
}
