use std::ffi::OsString;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, ExecutorError};

/// What to launch and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    /// Start the child in its own process group and signal the whole group.
    pub process_group: bool,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            process_group: false,
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    #[must_use]
    pub const fn process_group(mut self, enabled: bool) -> Self {
        self.process_group = enabled;
        self
    }

    #[must_use]
    pub fn display(&self) -> String {
        let mut parts = vec![self.program.to_string_lossy().into_owned()];
        parts.extend(self.args.iter().map(|arg| arg.to_string_lossy().into_owned()));
        parts.join(" ")
    }

    pub(crate) fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = self.cwd.as_ref() {
            command.current_dir(cwd);
        }
        #[cfg(unix)]
        if self.process_group {
            command.process_group(0);
        }
        command
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    NotStarted,
    Running,
    /// Exit code, `None` when the process was ended by a signal.
    Exited(Option<i32>),
}

/// Owns one child process from spawn to reaping.
#[derive(Debug, Default)]
pub struct ProcessSupervisor {
    child: Option<Child>,
    exit: Option<ExitStatus>,
    signal_group: bool,
    label: String,
}

impl ProcessSupervisor {
    /// Spawns the command with the given output targets.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Spawn`] when the program cannot be started.
    pub fn start(spec: &CommandSpec, stdout: Stdio, stderr: Stdio) -> AppResult<Self> {
        let label = spec.display();
        debug!("Starting process: {}", label);
        let child = spec
            .command()
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| {
                AppError::executor(ExecutorError::Spawn {
                    program: spec.program.to_string_lossy().into_owned(),
                    source: err,
                })
            })?;
        debug!("Process started, PID: {:?}", child.id());
        Ok(Self {
            child: Some(child),
            exit: None,
            signal_group: spec.process_group,
            label,
        })
    }

    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    /// Checks the child without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error when the OS cannot report the child state.
    pub fn poll(&mut self) -> AppResult<ProcessStatus> {
        if let Some(status) = self.exit {
            return Ok(ProcessStatus::Exited(status.code()));
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(ProcessStatus::NotStarted);
        };
        match child.try_wait().map_err(|err| {
            AppError::executor(ExecutorError::Io {
                context: "poll process",
                source: err,
            })
        })? {
            Some(status) => {
                self.exit = Some(status);
                Ok(ProcessStatus::Exited(status.code()))
            }
            None => Ok(ProcessStatus::Running),
        }
    }

    /// Stops the child if it is still running: a termination request first,
    /// then a kill once `grace` has elapsed. Safe to call repeatedly or on a
    /// supervisor that never started anything.
    ///
    /// # Errors
    ///
    /// Returns an error when the child cannot be killed or reaped.
    pub async fn stop(&mut self, grace: Duration) -> AppResult<Option<ExitStatus>> {
        if self.poll()? != ProcessStatus::Running {
            return Ok(self.exit);
        }
        let Some(child) = self.child.as_mut() else {
            return Ok(self.exit);
        };

        info!("Process still running, shutting it down: {}", self.label);
        request_termination(child, self.signal_group);
        let status = match tokio::time::timeout(grace, child.wait()).await {
            Ok(result) => result,
            Err(_elapsed) => {
                warn!(
                    "Process did not exit within {:?}, killing it: {}",
                    grace, self.label
                );
                force_kill(child, self.signal_group);
                child.wait().await
            }
        }
        .map_err(|err| {
            AppError::executor(ExecutorError::Io {
                context: "wait for process",
                source: err,
            })
        })?;
        self.exit = Some(status);
        Ok(self.exit)
    }

    /// Waits for the child to finish on its own.
    ///
    /// # Errors
    ///
    /// Returns an error when the child cannot be reaped.
    pub async fn wait(&mut self) -> AppResult<ProcessStatus> {
        if let Some(child) = self.child.as_mut()
            && self.exit.is_none()
        {
            let status = child.wait().await.map_err(|err| {
                AppError::executor(ExecutorError::Io {
                    context: "wait for process",
                    source: err,
                })
            })?;
            self.exit = Some(status);
        }
        self.poll()
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child, group: bool) {
    let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    let target = if group { pid.saturating_neg() } else { pid };
    // Safety: kill only sends a signal to a process we spawned; no memory is touched.
    let rc = unsafe { libc::kill(target, libc::SIGTERM) };
    if rc != 0 {
        debug!(
            "SIGTERM to {} failed: {}",
            target,
            std::io::Error::last_os_error()
        );
    }
}

/// Kills the whole group when the child leads one, otherwise only the child.
#[cfg(unix)]
fn force_kill(child: &mut Child, group: bool) {
    if group && let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        // Safety: kill only sends a signal to a process group we spawned; no memory is touched.
        let rc = unsafe { libc::kill(pid.saturating_neg(), libc::SIGKILL) };
        if rc == 0 {
            return;
        }
        debug!(
            "SIGKILL to group {} failed: {}",
            pid,
            std::io::Error::last_os_error()
        );
    }
    if let Err(err) = child.start_kill() {
        debug!("Kill request failed: {}", err);
    }
}

#[cfg(not(unix))]
fn force_kill(child: &mut Child, _group: bool) {
    if let Err(err) = child.start_kill() {
        debug!("Kill request failed: {}", err);
    }
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child, _group: bool) {
    if let Err(err) = child.start_kill() {
        debug!("Kill request failed: {}", err);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::error::{AppError, AppResult, ExecutorError};
    use std::future::Future;

    fn run_async_test<F>(future: F) -> AppResult<()>
    where
        F: Future<Output = AppResult<()>>,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(future)
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[test]
    fn poll_reports_running_then_exit_code() -> AppResult<()> {
        run_async_test(async {
            let mut process =
                ProcessSupervisor::start(&sh("sleep 0.3; exit 3"), Stdio::null(), Stdio::null())?;
            if process.poll()? != ProcessStatus::Running {
                return Err(AppError::executor(ExecutorError::from("Expected running")));
            }
            let status = process.wait().await?;
            if status != ProcessStatus::Exited(Some(3)) {
                return Err(AppError::executor(ExecutorError::from(format!(
                    "Unexpected status: {:?}",
                    status
                ))));
            }
            Ok(())
        })
    }

    #[test]
    fn stop_terminates_and_is_idempotent() -> AppResult<()> {
        run_async_test(async {
            let mut process = ProcessSupervisor::start(&sh("sleep 30"), Stdio::null(), Stdio::null())?;
            let started = std::time::Instant::now();
            process.stop(Duration::from_secs(5)).await?;
            if started.elapsed() >= Duration::from_secs(5) {
                return Err(AppError::executor(ExecutorError::from(
                    "Graceful stop should not need the grace period",
                )));
            }
            if process.poll()? == ProcessStatus::Running {
                return Err(AppError::executor(ExecutorError::from("Still running")));
            }
            process.stop(Duration::from_secs(5)).await?;
            Ok(())
        })
    }

    #[test]
    fn stop_kills_after_grace_when_term_is_ignored() -> AppResult<()> {
        run_async_test(async {
            let mut process = ProcessSupervisor::start(
                &sh("trap '' TERM; sleep 30"),
                Stdio::null(),
                Stdio::null(),
            )?;
            tokio::time::sleep(Duration::from_millis(100)).await;
            let status = process.stop(Duration::from_millis(200)).await?;
            if status.is_none_or(|status| status.success()) {
                return Err(AppError::executor(ExecutorError::from(
                    "Expected a killed process",
                )));
            }
            Ok(())
        })
    }

    /// Zombies count as dead: an orphan may wait a while for its reaper.
    fn pid_alive(pid: i32) -> bool {
        // Safety: signal 0 only checks that the process exists.
        let exists = unsafe { libc::kill(pid, 0) == 0 };
        let zombie = std::fs::read_to_string(format!("/proc/{}/stat", pid))
            .ok()
            .is_some_and(|stat| {
                stat.rsplit_once(')')
                    .is_some_and(|(_, rest)| rest.trim_start().starts_with('Z'))
            });
        exists && !zombie
    }

    #[test]
    fn forced_stop_kills_the_whole_group() -> AppResult<()> {
        let dir = tempfile::tempdir()?;
        let pid_file = dir.path().join("grandchild.pid");
        let script = format!(
            "trap '' TERM; sh -c \"trap '' TERM; echo \\$\\$ > '{}'; exec sleep 30\" & sleep 30",
            pid_file.display()
        );
        run_async_test(async move {
            let mut process = ProcessSupervisor::start(
                &sh(&script).process_group(true),
                Stdio::null(),
                Stdio::null(),
            )?;
            let mut grandchild = None;
            for _ in 0..100 {
                if let Some(pid) = std::fs::read_to_string(&pid_file)
                    .ok()
                    .and_then(|text| text.trim().parse::<i32>().ok())
                {
                    grandchild = Some(pid);
                    break;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            let Some(grandchild) = grandchild else {
                return Err(AppError::executor(ExecutorError::from("Grandchild did not start")));
            };

            process.stop(Duration::from_millis(300)).await?;
            for _ in 0..50 {
                if !pid_alive(grandchild) {
                    return Ok(());
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(AppError::executor(ExecutorError::from(format!(
                "Grandchild {} survived forced stop",
                grandchild
            ))))
        })
    }

    #[test]
    fn stop_without_start_is_noop() -> AppResult<()> {
        run_async_test(async {
            let mut process = ProcessSupervisor::default();
            if process.poll()? != ProcessStatus::NotStarted {
                return Err(AppError::executor(ExecutorError::from("Expected not started")));
            }
            if process.stop(Duration::from_millis(10)).await?.is_some() {
                return Err(AppError::executor(ExecutorError::from("Expected no status")));
            }
            Ok(())
        })
    }
}
