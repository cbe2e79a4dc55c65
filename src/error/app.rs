use thiserror::Error;

use super::{ConfigError, ExecutorError, InstallError, ResultsError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),
    #[error("Installation error: {0}")]
    Install(#[from] InstallError),
    #[error("Results error: {0}")]
    Results(#[from] ResultsError),
}

pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification the host uses to decide between retrying and aborting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Missing script/requests or an unusable run file. Never retried.
    Configuration,
    /// The tool exited with a non-zero code.
    Process,
    /// The tool exited cleanly but produced no usable results.
    Data,
    /// The tool could not be verified, downloaded or unpacked.
    Installation,
    Other,
}

impl FailureClass {
    #[must_use]
    pub const fn is_warning(self) -> bool {
        matches!(self, FailureClass::Data)
    }
}

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn executor<E>(error: E) -> Self
    where
        E: Into<ExecutorError>,
    {
        error.into().into()
    }

    pub fn install<E>(error: E) -> Self
    where
        E: Into<InstallError>,
    {
        error.into().into()
    }

    pub fn results<E>(error: E) -> Self
    where
        E: Into<ResultsError>,
    {
        error.into().into()
    }

    #[must_use]
    pub const fn failure_class(&self) -> FailureClass {
        match self {
            AppError::Config(_) | AppError::Validation(_) => FailureClass::Configuration,
            AppError::Executor(error) => error.failure_class(),
            AppError::Install(_) => FailureClass::Installation,
            AppError::Results(ResultsError::MissingColumn { .. }) => FailureClass::Data,
            AppError::Results(_) | AppError::Io { .. } | AppError::Clap { .. } | AppError::Join { .. } => {
                FailureClass::Other
            }
        }
    }
}
