mod app;
mod config;
mod executor;
mod install;
mod results;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult, FailureClass};
pub use config::ConfigError;
pub use executor::ExecutorError;
pub use install::InstallError;
pub use results::ResultsError;
pub use validation::ValidationError;
