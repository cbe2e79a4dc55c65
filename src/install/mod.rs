//! Locating, downloading and verifying the Grinder distribution.
//!
//! `ToolInstaller::ensure_installed` walks an explicit state machine:
//! the jar is probed first, and only when it cannot run are the mirror
//! candidates tried in order, the first successful archive extracted and the
//! jar probed again.

mod archive;
mod download;
mod mirrors;
mod probe;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::types::ExecutorSettings;
use crate::error::{AppError, AppResult, InstallError};

pub use download::{DownloadPort, HttpDownloader};
pub use mirrors::MirrorResolver;
pub use probe::{GRINDER_MAIN_CLASS, JavaToolProbe, ToolProbe};

const TOOL_NAME: &str = "Grinder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The jar was already runnable.
    AlreadyInstalled,
    /// The jar was installed from `url`.
    Installed { url: String },
}

/// What the executor needs from an installer at prepare time.
#[async_trait]
pub trait InstallPort: Send + Sync {
    async fn ensure_installed(&self) -> AppResult<InstallOutcome>;
}

enum InstallState {
    Unchecked,
    Resolving,
    Downloading {
        candidates: Vec<String>,
        next: usize,
    },
    Extracting {
        archive: tempfile::NamedTempFile,
        url: String,
    },
    Reverify {
        url: String,
    },
}

pub struct ToolInstaller<D, P> {
    tool_path: PathBuf,
    version: String,
    mirrors_page: String,
    resolver: MirrorResolver,
    downloader: D,
    probe: P,
}

impl<D, P> ToolInstaller<D, P>
where
    D: DownloadPort,
    P: ToolProbe,
{
    #[must_use]
    pub fn new(tool_path: PathBuf, settings: &ExecutorSettings, downloader: D, probe: P) -> Self {
        Self {
            tool_path,
            version: settings.version.clone(),
            mirrors_page: settings.mirrors_page.clone(),
            resolver: MirrorResolver::new(settings.mirror_link.clone(), settings.download_link.clone()),
            downloader,
            probe,
        }
    }

    #[must_use]
    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    /// Directory the distribution is unpacked into: two levels above the jar.
    ///
    /// # Errors
    ///
    /// Returns `NoInstallDir` when the tool path has fewer than two parents.
    pub fn install_dir(&self) -> AppResult<PathBuf> {
        self.tool_path
            .parent()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                AppError::install(InstallError::NoInstallDir {
                    path: self.tool_path.clone(),
                })
            })
    }

    /// Makes sure the runtime works and the tool jar is runnable, installing
    /// it when necessary.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeMissing` when the runtime cannot start, `ToolUnavailable`
    /// when every candidate URL fails and `Installation` when the jar still
    /// cannot run after extraction.
    pub async fn ensure_installed(&self) -> AppResult<InstallOutcome> {
        self.probe.verify_runtime().await?;

        let mut state = InstallState::Unchecked;
        loop {
            state = match state {
                InstallState::Unchecked => {
                    if self.probe.can_run(&self.tool_path).await {
                        debug!("{} found at {}", TOOL_NAME, self.tool_path.display());
                        return Ok(InstallOutcome::AlreadyInstalled);
                    }
                    info!(
                        "Will install {} into {}",
                        TOOL_NAME,
                        self.tool_path.display()
                    );
                    InstallState::Resolving
                }
                InstallState::Resolving => {
                    let page = self.fetch_mirrors_page().await;
                    let candidates = self.resolver.resolve(page.as_deref(), &self.version);
                    InstallState::Downloading {
                        candidates,
                        next: 0,
                    }
                }
                InstallState::Downloading { candidates, next } => {
                    let Some(url) = candidates.get(next).cloned() else {
                        return Err(AppError::install(InstallError::ToolUnavailable {
                            tool: TOOL_NAME,
                            attempted: candidates,
                        }));
                    };
                    match self.download_candidate(&url).await {
                        Ok(archive) => InstallState::Extracting { archive, url },
                        Err(err) => {
                            warn!("Error while downloading {}: {}", url, err);
                            InstallState::Downloading {
                                candidates,
                                next: next.saturating_add(1),
                            }
                        }
                    }
                }
                InstallState::Extracting { archive, url } => {
                    self.extract(archive).await?;
                    InstallState::Reverify { url }
                }
                InstallState::Reverify { url } => {
                    if !self.probe.can_run(&self.tool_path).await {
                        return Err(AppError::install(InstallError::Installation {
                            tool: TOOL_NAME,
                            path: self.tool_path.clone(),
                        }));
                    }
                    info!("Installed {} successfully", TOOL_NAME);
                    return Ok(InstallOutcome::Installed { url });
                }
            };
        }
    }

    async fn fetch_mirrors_page(&self) -> Option<String> {
        let url = self.mirrors_page.replace("{version}", &self.version);
        debug!("Retrieving mirrors from page: {}", url);
        match self.downloader.fetch_page(&url).await {
            Ok(page) => Some(page),
            Err(err) => {
                warn!("Failed to fetch mirrors page: {}", err);
                None
            }
        }
    }

    async fn download_candidate(&self, url: &str) -> AppResult<tempfile::NamedTempFile> {
        let archive = tempfile::Builder::new()
            .prefix("grinder-dist-")
            .suffix(".zip")
            .tempfile()?;
        info!("Downloading {}", url);
        self.downloader.download(url, archive.path()).await?;
        Ok(archive)
    }

    async fn extract(&self, download: tempfile::NamedTempFile) -> AppResult<()> {
        let dest = self.install_dir()?;
        let folder = format!("grinder-{}", self.version);
        let source = download.path().to_path_buf();
        let extracted =
            tokio::task::spawn_blocking(move || archive::extract_folder(&source, &dest, &folder))
                .await?;
        download.close().map_err(|err| {
            AppError::install(InstallError::Io {
                context: "remove downloaded archive",
                source: err,
            })
        })?;
        extracted.map(|_| ())
    }
}

#[async_trait]
impl<D, P> InstallPort for ToolInstaller<D, P>
where
    D: DownloadPort,
    P: ToolProbe,
{
    async fn ensure_installed(&self) -> AppResult<InstallOutcome> {
        ToolInstaller::ensure_installed(self).await
    }
}

#[cfg(test)]
mod tests;
