use std::fs::File;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::error::{AppError, AppResult, InstallError};

/// Extracts the entries below `folder/` into `dest`, dropping the folder prefix.
/// Returns the number of files written.
pub(crate) fn extract_folder(archive: &Path, dest: &Path, folder: &str) -> AppResult<usize> {
    info!("Unzipping {}", archive.display());
    let archive_error = |message: String| {
        AppError::install(InstallError::Archive {
            path: archive.to_path_buf(),
            message,
        })
    };
    let file = File::open(archive).map_err(|err| {
        AppError::install(InstallError::Io {
            context: "open downloaded archive",
            source: err,
        })
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|err| archive_error(err.to_string()))?;

    let mut written = 0usize;
    let mut matched = false;
    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|err| archive_error(err.to_string()))?;
        let Some(name) = entry.enclosed_name() else {
            debug!("Skipping unsafe archive entry: {}", entry.name());
            continue;
        };
        let Some(relative) = strip_folder(&name, folder) else {
            continue;
        };
        matched = true;
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = dest.join(&relative);
        let io_error = |err: std::io::Error| {
            AppError::install(InstallError::Io {
                context: "write extracted file",
                source: err,
            })
        };
        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(io_error)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        let mut out = File::create(&target).map_err(io_error)?;
        std::io::copy(&mut entry, &mut out).map_err(io_error)?;
        written = written.saturating_add(1);
    }

    if !matched {
        return Err(AppError::install(InstallError::ArchiveFolderMissing {
            path: archive.to_path_buf(),
            prefix: folder.to_owned(),
        }));
    }
    debug!("Extracted {} files into {}", written, dest.display());
    Ok(written)
}

fn strip_folder(name: &Path, folder: &str) -> Option<PathBuf> {
    let mut components = name.components();
    match components.next() {
        Some(Component::Normal(first)) if first == folder => Some(components.as_path().to_path_buf()),
        Some(_) | None => None,
    }
}
