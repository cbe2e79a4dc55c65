use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::ExecutorSettings;

/// Location of the tool jar when the run file does not set `executor.path`.
pub(crate) const DEFAULT_TOOL_PATH: &str = "~/.grinder-bridge/grinder-taurus/lib/grinder.jar";

/// `~/.grinder-bridge/artifacts/<local timestamp>`.
#[must_use]
pub fn default_artifacts_dir() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    default_base_dir().join("artifacts").join(stamp.to_string())
}

fn default_base_dir() -> PathBuf {
    if let Some(home) = user_home_dir() {
        return home.join(".grinder-bridge");
    }

    PathBuf::from(".grinder-bridge")
}

fn user_home_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        if let Some(value) = std::env::var_os("USERPROFILE") {
            return Some(PathBuf::from(value));
        }
    }

    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expands a leading `~` and makes the path absolute against the working directory.
///
/// # Errors
///
/// Returns an error when `~` is used without a home directory or the working
/// directory is unavailable.
pub fn resolve_user_path(raw: &str) -> AppResult<PathBuf> {
    let expanded = match raw.strip_prefix('~') {
        Some(rest) => {
            let home = user_home_dir().ok_or_else(|| {
                AppError::config(ConfigError::HomeUnavailable {
                    path: raw.to_owned(),
                })
            })?;
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(raw),
    };
    absolute(&expanded)
}

/// Tool jar location from the settings, or the default one.
///
/// # Errors
///
/// Returns an error when the path cannot be resolved.
pub fn resolve_tool_path(settings: &ExecutorSettings) -> AppResult<PathBuf> {
    let raw = settings
        .path
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(DEFAULT_TOOL_PATH);
    resolve_user_path(raw)
}

pub(crate) fn absolute(path: &Path) -> AppResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    Ok(std::env::current_dir()?.join(path))
}
