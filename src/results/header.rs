use std::collections::BTreeMap;
use std::path::Path;

use crate::error::ResultsError;

pub(crate) const START_TIME: &str = "Start time (ms since Epoch)";
pub(crate) const TEST_TIME: &str = "Test time";
pub(crate) const FIRST_BYTE: &str = "Time to first byte";
pub(crate) const RESPONSE_CODE: &str = "HTTP response code";
pub(crate) const RESOLVE_HOST: &str = "Time to resolve host";
pub(crate) const CONNECT: &str = "Time to establish connection";
pub(crate) const ERRORS: &str = "Errors";

/// Column positions resolved once from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: BTreeMap<String, usize>,
    pub(crate) start_time: usize,
    pub(crate) test_time: usize,
    pub(crate) first_byte: usize,
    pub(crate) response_code: usize,
    pub(crate) resolve_host: usize,
    pub(crate) connect: usize,
    pub(crate) errors: usize,
}

impl ColumnIndex {
    /// Maps trimmed header names to positions and checks the required columns.
    ///
    /// # Errors
    ///
    /// Returns [`ResultsError::MissingColumn`] when a required column is absent.
    pub fn from_header(line: &str, delimiter: char, path: &Path) -> Result<Self, ResultsError> {
        let mut positions = BTreeMap::new();
        for (idx, name) in line.trim_end_matches(['\r', '\n']).split(delimiter).enumerate() {
            positions.insert(name.trim().to_owned(), idx);
        }
        let require = |column: &'static str| {
            positions
                .get(column)
                .copied()
                .ok_or_else(|| ResultsError::MissingColumn {
                    column,
                    path: path.to_path_buf(),
                })
        };
        Ok(Self {
            start_time: require(START_TIME)?,
            test_time: require(TEST_TIME)?,
            first_byte: require(FIRST_BYTE)?,
            response_code: require(RESPONSE_CODE)?,
            resolve_host: require(RESOLVE_HOST)?,
            connect: require(CONNECT)?,
            errors: require(ERRORS)?,
            positions,
        })
    }

    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.positions.len()
    }
}
