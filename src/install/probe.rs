use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, AppResult, InstallError};

/// Main class used both for the installation self-check and for real runs.
pub const GRINDER_MAIN_CLASS: &str = "net.grinder.Grinder";

/// Checks whether the runtime and the tool can be executed.
#[async_trait]
pub trait ToolProbe: Send + Sync {
    /// Fails with `RuntimeMissing` when the runtime cannot be started.
    async fn verify_runtime(&self) -> AppResult<()>;
    /// True when the tool at `tool_path` runs and exits successfully.
    async fn can_run(&self, tool_path: &Path) -> bool;
}

/// Probe backed by a `java` executable.
#[derive(Debug, Clone)]
pub struct JavaToolProbe {
    java: String,
}

impl JavaToolProbe {
    #[must_use]
    pub fn new(java: impl Into<String>) -> Self {
        Self { java: java.into() }
    }

    async fn run(&self, args: &[&OsStr]) -> std::io::Result<std::process::Output> {
        Command::new(&self.java)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
    }
}

#[async_trait]
impl ToolProbe for JavaToolProbe {
    async fn verify_runtime(&self) -> AppResult<()> {
        debug!("Checking Java: {} -version", self.java);
        match self.run(&[OsStr::new("-version")]).await {
            Ok(output) if output.status.success() => {
                debug!("Java output: {}", String::from_utf8_lossy(&output.stderr).trim());
                Ok(())
            }
            Ok(output) => Err(AppError::install(InstallError::RuntimeMissing {
                runtime: self.java.clone(),
                message: format!("exited with {}", output.status),
            })),
            Err(err) => Err(AppError::install(InstallError::RuntimeMissing {
                runtime: self.java.clone(),
                message: err.to_string(),
            })),
        }
    }

    async fn can_run(&self, tool_path: &Path) -> bool {
        debug!("Trying Grinder: {}", tool_path.display());
        let args = [
            OsStr::new("-classpath"),
            tool_path.as_os_str(),
            OsStr::new(GRINDER_MAIN_CLASS),
        ];
        match self.run(&args).await {
            Ok(output) => {
                debug!(
                    "Grinder check output: {}{}",
                    String::from_utf8_lossy(&output.stdout).trim(),
                    String::from_utf8_lossy(&output.stderr).trim()
                );
                output.status.success()
            }
            Err(err) => {
                debug!("Grinder check failed: {}", err);
                false
            }
        }
    }
}
