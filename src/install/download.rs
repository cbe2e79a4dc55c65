use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult, InstallError};

/// Network side of the installer.
#[async_trait]
pub trait DownloadPort: Send + Sync {
    /// Fetches a page as text.
    async fn fetch_page(&self, url: &str) -> AppResult<String>;
    /// Streams `url` into `dest`, returning the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64>;
}

/// HTTP downloader with a per-request timeout. Redirects are followed.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Builds a client whose requests and connects are bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `Download` when the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| {
                AppError::install(InstallError::Download {
                    url: String::new(),
                    source: err,
                })
            })?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str) -> AppResult<reqwest::Response> {
        let parsed = url::Url::parse(url).map_err(|err| {
            AppError::install(InstallError::InvalidUrl {
                url: url.to_owned(),
                source: err,
            })
        })?;
        let response = self.client.get(parsed).send().await.map_err(|err| {
            AppError::install(InstallError::Download {
                url: url.to_owned(),
                source: err,
            })
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::install(InstallError::DownloadStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            }));
        }
        Ok(response)
    }
}

#[async_trait]
impl DownloadPort for HttpDownloader {
    async fn fetch_page(&self, url: &str) -> AppResult<String> {
        let response = self.get(url).await?;
        response.text().await.map_err(|err| {
            AppError::install(InstallError::Download {
                url: url.to_owned(),
                source: err,
            })
        })
    }

    async fn download(&self, url: &str, dest: &Path) -> AppResult<u64> {
        let response = self.get(url).await?;
        let io_error = |err: std::io::Error| {
            AppError::install(InstallError::Io {
                context: "write downloaded archive",
                source: err,
            })
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(io_error)?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|err| {
                AppError::install(InstallError::Download {
                    url: url.to_owned(),
                    source: err,
                })
            })?;
            file.write_all(&chunk).await.map_err(io_error)?;
            written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        }
        file.flush().await.map_err(io_error)?;
        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}
