use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::types::HookTaskSpec;
use crate::error::{AppError, AppResult, ExecutorError};
use crate::process::{CommandSpec, ProcessStatus, ProcessSupervisor};

#[derive(Debug)]
enum Capture {
    /// Output requested into a user file.
    File,
    /// Output kept in a scratch file and logged when the task ends.
    Scratch(NamedTempFile),
}

impl Capture {
    fn open(target: Option<&Path>, working_dir: &Path) -> AppResult<(Self, Stdio)> {
        let io_error = |err: std::io::Error| {
            AppError::executor(ExecutorError::Io {
                context: "open task output",
                source: err,
            })
        };
        match target {
            Some(path) => {
                let file = std::fs::File::create(working_dir.join(path)).map_err(io_error)?;
                Ok((Capture::File, Stdio::from(file)))
            }
            None => {
                let scratch = NamedTempFile::new().map_err(io_error)?;
                let handle = scratch.reopen().map_err(io_error)?;
                Ok((Capture::Scratch(scratch), Stdio::from(handle)))
            }
        }
    }

    fn contents(&self) -> Option<String> {
        match self {
            Capture::File => None,
            Capture::Scratch(file) => std::fs::read_to_string(file.path())
                .ok()
                .filter(|text| !text.trim().is_empty()),
        }
    }
}

#[derive(Debug)]
struct RunningTask {
    supervisor: ProcessSupervisor,
    stdout: Capture,
    stderr: Capture,
    /// Set once the exit has been observed and reported.
    exit: Option<Option<i32>>,
}

/// One shell command attached to a stage.
#[derive(Debug)]
pub struct ShellTask {
    spec: HookTaskSpec,
    working_dir: PathBuf,
    running: Option<RunningTask>,
}

impl ShellTask {
    #[must_use]
    pub fn new(spec: HookTaskSpec, working_dir: PathBuf) -> Self {
        Self {
            spec,
            working_dir,
            running: None,
        }
    }

    fn shell_command(&self) -> CommandSpec {
        #[cfg(windows)]
        let base = CommandSpec::new("cmd").arg("/C");
        #[cfg(not(windows))]
        let base = CommandSpec::new("sh").arg("-c");
        base.arg(&self.spec.command)
            .cwd(&self.working_dir)
            .process_group(true)
    }

    /// Runs the command. Foreground tasks are waited for and checked;
    /// background tasks keep running until `check` sees them exit or
    /// `shutdown` stops them. Starting a background task twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` when a foreground task exits non-zero and failures
    /// are not ignored, or an error when the shell cannot be spawned.
    pub async fn start(&mut self) -> AppResult<()> {
        if self.running.is_some() {
            self.check()?;
            info!("Process still running: {}", self.spec.command);
            return Ok(());
        }

        let (stdout, stdout_stdio) = Capture::open(self.spec.out.as_deref(), &self.working_dir)?;
        let (stderr, stderr_stdio) = Capture::open(self.spec.err.as_deref(), &self.working_dir)?;
        debug!("Starting task: {}", self.spec.command);
        let supervisor = ProcessSupervisor::start(&self.shell_command(), stdout_stdio, stderr_stdio)?;
        let mut running = RunningTask {
            supervisor,
            stdout,
            stderr,
            exit: None,
        };

        if self.spec.background {
            debug!("Task started, PID: {:?}", running.supervisor.pid());
            self.running = Some(running);
            return Ok(());
        }
        running.supervisor.wait().await?;
        self.running = Some(running);
        let checked = self.check();
        self.running = None;
        checked.map(|_| ())
    }

    /// Returns `true` once the task has finished.
    ///
    /// # Errors
    ///
    /// Returns `TaskFailed` the first time a non-zero exit is observed unless
    /// failures are ignored.
    pub fn check(&mut self) -> AppResult<bool> {
        let Some(running) = self.running.as_mut() else {
            return Ok(true);
        };
        if running.exit.is_some() {
            return Ok(true);
        }
        let code = match running.supervisor.poll()? {
            ProcessStatus::Running => {
                debug!("Task: {} is not finished yet", self.spec.command);
                return Ok(false);
            }
            ProcessStatus::NotStarted => return Ok(true),
            ProcessStatus::Exited(code) => code,
        };
        running.exit = Some(code);

        let stdout = running.stdout.contents();
        if let Some(text) = stdout.as_deref() {
            debug!("Output for {}:\n{}", self.spec.command, text);
        }
        if let Some(text) = running.stderr.contents() {
            warn!("Errors for {}:\n{}", self.spec.command, text);
        }
        debug!(
            "Task was finished with exit code {:?}: {}",
            code, self.spec.command
        );
        if !self.spec.ignore_failure && code != Some(0) {
            return Err(AppError::executor(ExecutorError::TaskFailed {
                command: self.spec.command.clone(),
                code,
            }));
        }
        Ok(true)
    }

    /// Stops the task if it is still running and forgets it.
    ///
    /// # Errors
    ///
    /// Returns the failure observed while checking, or an error when the
    /// process cannot be stopped.
    pub async fn shutdown(&mut self, grace: Duration) -> AppResult<()> {
        let checked = self.check();
        if let Some(running) = self.running.as_mut()
            && running.exit.is_none()
        {
            info!(
                "Background task was not completed, shutting it down: {}",
                self.spec.command
            );
            running.supervisor.stop(grace).await?;
        }
        self.running = None;
        checked.map(|_| ())
    }
}
