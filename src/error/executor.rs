use std::path::PathBuf;
use thiserror::Error;

use super::FailureClass;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("There must be a script file or a list of requests to run Grinder.")]
    MissingScript,
    #[error("Grinder exited with non-zero code {code:?}; see '{stderr}'.")]
    ProcessFailed { code: Option<i32>, stderr: PathBuf },
    #[error("Empty results log, most likely the tool failed: '{path}'.")]
    EmptyResults { path: PathBuf },
    #[error("Cannot {operation} while executor is {state}.")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Shell task '{command}' failed with exit code {code:?}.")]
    TaskFailed { command: String, code: Option<i32> },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}

impl ExecutorError {
    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self {
            ExecutorError::MissingScript => FailureClass::Configuration,
            ExecutorError::ProcessFailed { .. } | ExecutorError::TaskFailed { .. } => {
                FailureClass::Process
            }
            ExecutorError::EmptyResults { .. } => FailureClass::Data,
            ExecutorError::InvalidState { .. }
            | ExecutorError::Spawn { .. }
            | ExecutorError::Io { .. } => FailureClass::Other,
            #[cfg(test)]
            ExecutorError::TestExpectation { .. } | ExecutorError::TestExpectationValue { .. } => {
                FailureClass::Other
            }
        }
    }
}
