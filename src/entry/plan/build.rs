use std::path::PathBuf;

use grinder_bridge::args::{BridgeArgs, Command};
use grinder_bridge::config::types::RunFile;
use grinder_bridge::config::{
    LoadProfile, Timings, default_artifacts_dir, load_run_file, resolve_tool_path, resolve_user_path,
};
use grinder_bridge::error::AppResult;
use grinder_bridge::executor::ExecutorConfig;

use super::types::{BridgePlan, InstallPlan, RunPlan};

pub(crate) fn build_plan(args: BridgeArgs) -> AppResult<RunPlan> {
    let run = load_run_file(args.config.as_deref())?.unwrap_or_default();
    let mut timings = Timings::from_run_file(&run, args.poll_interval)?;

    if let Some(Command::Install(install)) = args.command {
        if let Some(timeout) = install.download_timeout {
            timings.download_timeout = timeout;
        }
        let tool_path = resolve_tool_path(&run.executor)?;
        return Ok(RunPlan::Install(InstallPlan {
            settings: run.executor,
            tool_path,
            timings,
        }));
    }

    let artifacts_dir = artifacts_dir(args.artifacts_dir.as_deref(), &run)?;
    let load = LoadProfile::from_config(&run.load)?;
    Ok(RunPlan::Run(Box::new(BridgePlan {
        executor: ExecutorConfig {
            settings: run.executor,
            scenario: run.scenario,
            load,
            stop_grace: timings.stop_grace,
        },
        hooks: run.hooks,
        artifacts_dir,
        timings,
    })))
}

fn artifacts_dir(cli: Option<&str>, run: &RunFile) -> AppResult<PathBuf> {
    match cli.or(run.artifacts_dir.as_deref()) {
        Some(raw) => resolve_user_path(raw),
        None => Ok(default_artifacts_dir()),
    }
}
