//! Shell commands attached to lifecycle stages.

mod task;

use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::config::types::{HookTaskConfig, HooksConfig};
use crate::error::AppResult;

pub use task::ShellTask;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    Prepare,
    Startup,
    Check,
    Shutdown,
    PostProcess,
}

impl HookStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HookStage::Prepare => "prepare",
            HookStage::Startup => "startup",
            HookStage::Check => "check",
            HookStage::Shutdown => "shutdown",
            HookStage::PostProcess => "post-process",
        }
    }
}

/// Task lists for every stage, run in configuration order.
#[derive(Debug, Default)]
pub struct StageHooks {
    prepare: Vec<ShellTask>,
    startup: Vec<ShellTask>,
    check: Vec<ShellTask>,
    shutdown: Vec<ShellTask>,
    post_process: Vec<ShellTask>,
    grace: Duration,
}

fn load_tasks(stage: HookStage, configs: &[HookTaskConfig], working_dir: &Path) -> Vec<ShellTask> {
    configs
        .iter()
        .map(|config| {
            let spec = config.to_spec();
            debug!("Added task: {}, stage: {}", spec.command, stage.as_str());
            ShellTask::new(spec, working_dir.to_path_buf())
        })
        .collect()
}

async fn start_all(tasks: &mut [ShellTask]) -> AppResult<()> {
    for task in tasks {
        task.start().await?;
    }
    Ok(())
}

async fn shutdown_all(tasks: &mut [ShellTask], grace: Duration) -> AppResult<()> {
    for task in tasks {
        task.shutdown(grace).await?;
    }
    Ok(())
}

impl StageHooks {
    #[must_use]
    pub fn from_config(config: &HooksConfig, working_dir: &Path, grace: Duration) -> Self {
        Self {
            prepare: load_tasks(HookStage::Prepare, &config.prepare, working_dir),
            startup: load_tasks(HookStage::Startup, &config.startup, working_dir),
            check: load_tasks(HookStage::Check, &config.check, working_dir),
            shutdown: load_tasks(HookStage::Shutdown, &config.shutdown, working_dir),
            post_process: load_tasks(HookStage::PostProcess, &config.post_process, working_dir),
            grace,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prepare.is_empty()
            && self.startup.is_empty()
            && self.check.is_empty()
            && self.shutdown.is_empty()
            && self.post_process.is_empty()
    }

    /// # Errors
    ///
    /// Returns the first task failure.
    pub async fn prepare(&mut self) -> AppResult<()> {
        start_all(&mut self.prepare).await
    }

    /// # Errors
    ///
    /// Returns the first task failure.
    pub async fn startup(&mut self) -> AppResult<()> {
        start_all(&mut self.startup).await
    }

    /// Runs the check tasks, then checks every background task started so far.
    ///
    /// # Errors
    ///
    /// Returns the first task failure.
    pub async fn check(&mut self) -> AppResult<()> {
        start_all(&mut self.check).await?;
        for task in self
            .prepare
            .iter_mut()
            .chain(self.startup.iter_mut())
            .chain(self.check.iter_mut())
        {
            task.check()?;
        }
        Ok(())
    }

    /// Runs the shutdown tasks and stops background startup/check tasks.
    ///
    /// # Errors
    ///
    /// Returns the first task failure.
    pub async fn shutdown(&mut self) -> AppResult<()> {
        start_all(&mut self.shutdown).await?;
        shutdown_all(&mut self.check, self.grace).await?;
        shutdown_all(&mut self.startup, self.grace).await
    }

    /// Stops everything still running, then runs the post-process tasks.
    ///
    /// # Errors
    ///
    /// Returns the first task failure.
    pub async fn post_process(&mut self) -> AppResult<()> {
        shutdown_all(&mut self.shutdown, self.grace).await?;
        shutdown_all(&mut self.check, self.grace).await?;
        shutdown_all(&mut self.startup, self.grace).await?;
        shutdown_all(&mut self.prepare, self.grace).await?;
        for task in &mut self.post_process {
            task.start().await?;
            task.shutdown(self.grace).await?;
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests;
