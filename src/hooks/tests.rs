use std::path::Path;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use super::*;
use crate::config::types::HookTaskSpec;
use crate::error::{AppError, ExecutorError};

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: std::future::Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::validation(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn detailed(command: &str, background: bool, ignore_failure: bool) -> HookTaskConfig {
    HookTaskConfig::Detailed(HookTaskSpec {
        command: command.to_owned(),
        background,
        ignore_failure,
        out: None,
        err: None,
    })
}

fn hooks(config: &HooksConfig, dir: &Path) -> StageHooks {
    StageHooks::from_config(config, dir, Duration::from_secs(2))
}

#[test]
fn foreground_tasks_run_in_order() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        prepare: vec![
            HookTaskConfig::Command("echo one >> order.txt".to_owned()),
            HookTaskConfig::Command("echo two >> order.txt".to_owned()),
        ],
        post_process: vec![HookTaskConfig::Command("echo post >> order.txt".to_owned())],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    if !hooks(&HooksConfig::default(), &root).is_empty() {
        return Err(AppError::validation("Default hooks must be empty"));
    }
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        if stages.is_empty() {
            return Err(AppError::validation("Configured hooks must not be empty"));
        }
        stages.prepare().await?;
        stages.post_process().await?;
        let order = std::fs::read_to_string(root.join("order.txt"))?;
        if order != "one\ntwo\npost\n" {
            return Err(AppError::validation(format!("Unexpected order: {:?}", order)));
        }
        Ok(())
    })
}

#[test]
fn failing_foreground_task_is_reported() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        startup: vec![HookTaskConfig::Command("echo nope >&2; exit 4".to_owned())],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        match stages.startup().await {
            Err(AppError::Executor(ExecutorError::TaskFailed { code, .. })) if code == Some(4) => Ok(()),
            other => Err(AppError::validation(format!("Unexpected result: {:?}", other))),
        }
    })
}

#[test]
fn ignored_failure_passes() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        check: vec![detailed("exit 1", false, true)],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        stages.check().await?;
        stages.check().await
    })
}

#[test]
fn background_task_failure_surfaces_on_check() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        startup: vec![detailed("sleep 0.2; exit 2", true, false)],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        stages.startup().await?;
        stages.check().await?;
        tokio::time::sleep(Duration::from_millis(600)).await;
        match stages.check().await {
            Err(AppError::Executor(ExecutorError::TaskFailed { .. })) => {}
            other => return Err(AppError::validation(format!("Unexpected result: {:?}", other))),
        }
        stages.check().await
    })
}

#[test]
fn shutdown_stops_background_tasks() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        startup: vec![detailed("sleep 30", true, false)],
        shutdown: vec![HookTaskConfig::Command("echo down > down.txt".to_owned())],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        stages.startup().await?;
        stages.startup().await?;
        let begin = Instant::now();
        stages.shutdown().await?;
        if begin.elapsed() > Duration::from_secs(10) {
            return Err(AppError::validation("Shutdown took too long"));
        }
        if !root.join("down.txt").is_file() {
            return Err(AppError::validation("Shutdown task did not run"));
        }
        stages.post_process().await
    })
}

#[test]
fn output_can_go_to_files() -> AppResult<()> {
    let dir = tempdir()?;
    let config = HooksConfig {
        prepare: vec![HookTaskConfig::Detailed(HookTaskSpec {
            command: "echo out; echo err >&2".to_owned(),
            background: false,
            ignore_failure: false,
            out: Some("task.out".into()),
            err: Some("task.err".into()),
        })],
        ..HooksConfig::default()
    };
    let root = dir.path().to_path_buf();
    run_async_test(async move {
        let mut stages = hooks(&config, &root);
        if stages.is_empty() {
            return Err(AppError::validation("Hooks must not be empty"));
        }
        stages.prepare().await?;
        let out = std::fs::read_to_string(root.join("task.out"))?;
        let err = std::fs::read_to_string(root.join("task.err"))?;
        if out != "out\n" || err != "err\n" {
            return Err(AppError::validation(format!("Unexpected output: {:?} {:?}", out, err)));
        }
        Ok(())
    })
}
