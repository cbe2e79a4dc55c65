use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Failed to download {tool} from any of {count} mirrors.", count = .attempted.len())]
    ToolUnavailable {
        tool: &'static str,
        attempted: Vec<String>,
    },
    #[error("Unable to run {tool} at '{path}' after installation.")]
    Installation { tool: &'static str, path: PathBuf },
    #[error("'{runtime}' is required but cannot be executed: {message}")]
    RuntimeMissing { runtime: String, message: String },
    #[error("Download of '{url}' failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("Download of '{url}' returned HTTP {status}.")]
    DownloadStatus { url: String, status: u16 },
    #[error("Invalid download URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Failed to unpack '{path}': {message}")]
    Archive { path: PathBuf, message: String },
    #[error("Archive '{path}' has no entries under '{prefix}'.")]
    ArchiveFolderMissing { path: PathBuf, prefix: String },
    #[error("Tool path '{path}' has no installation directory.")]
    NoInstallDir { path: PathBuf },
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
