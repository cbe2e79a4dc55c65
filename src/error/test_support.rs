use super::{
    ConfigError, ExecutorError, InstallError, ResultsError, ValidationError,
};

impl From<&'static str> for ValidationError {
    fn from(message: &'static str) -> Self {
        ValidationError::TestExpectation { message }
    }
}

impl From<String> for ValidationError {
    fn from(value: String) -> Self {
        ValidationError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ConfigError {
    fn from(message: &'static str) -> Self {
        ConfigError::TestExpectation { message }
    }
}

impl From<String> for ConfigError {
    fn from(value: String) -> Self {
        ConfigError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ExecutorError {
    fn from(message: &'static str) -> Self {
        ExecutorError::TestExpectation { message }
    }
}

impl From<String> for ExecutorError {
    fn from(value: String) -> Self {
        ExecutorError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for InstallError {
    fn from(message: &'static str) -> Self {
        InstallError::TestExpectation { message }
    }
}

impl From<String> for InstallError {
    fn from(value: String) -> Self {
        InstallError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}

impl From<&'static str> for ResultsError {
    fn from(message: &'static str) -> Self {
        ResultsError::TestExpectation { message }
    }
}

impl From<String> for ResultsError {
    fn from(value: String) -> Self {
        ResultsError::TestExpectationValue {
            message: "Test expectation failed",
            value,
        }
    }
}
