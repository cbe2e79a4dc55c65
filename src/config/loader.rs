use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult, ConfigError};

use super::types::RunFile;

/// Run files checked in the working directory when `--config` is not given.
const DEFAULT_RUN_FILES: [&str; 2] = ["grinder.toml", "grinder.json"];

/// Loads a run file from the provided path or default locations.
///
/// # Errors
///
/// Returns an error when the run file cannot be read or parsed.
pub fn load_run_file(path: Option<&str>) -> AppResult<Option<RunFile>> {
    if let Some(path) = path {
        let path = PathBuf::from(path);
        return Ok(Some(load_run_file_at(&path)?));
    }

    for candidate in DEFAULT_RUN_FILES {
        let candidate = PathBuf::from(candidate);
        if candidate.exists() {
            return Ok(Some(load_run_file_at(&candidate)?));
        }
    }

    Ok(None)
}

pub(crate) fn load_run_file_at(path: &Path) -> AppResult<RunFile> {
    let content = std::fs::read_to_string(path).map_err(|err| {
        AppError::config(ConfigError::ReadConfig {
            path: path.to_path_buf(),
            source: err,
        })
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => toml::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseToml {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some("json") => serde_json::from_str(&content).map_err(|err| {
            AppError::config(ConfigError::ParseJson {
                path: path.to_path_buf(),
                source: err,
            })
        }),
        Some(ext) => Err(AppError::config(ConfigError::UnsupportedExtension {
            ext: ext.to_owned(),
        })),
        None => Err(AppError::config(ConfigError::MissingExtension)),
    }
}
