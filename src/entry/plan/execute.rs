use std::path::PathBuf;
use std::time::Duration;

use grinder_bridge::config::types::ExecutorSettings;
use grinder_bridge::error::{AppError, AppResult};
use grinder_bridge::executor::{ArtifactDir, GrinderExecutor, PollOutcome};
use grinder_bridge::hooks::StageHooks;
use grinder_bridge::install::{HttpDownloader, InstallOutcome, JavaToolProbe, ToolInstaller};
use tracing::{debug, error, info, warn};

use crate::entry::totals::RunTotals;
use crate::shutdown::{ShutdownReceiver, shutdown_requested};
use crate::shutdown_handlers::{setup_signal_shutdown_handler, shutdown_channel};

use super::types::{BridgePlan, InstallPlan, RunPlan};

type Installer = ToolInstaller<HttpDownloader, JavaToolProbe>;

pub(crate) async fn execute_plan(plan: RunPlan) -> AppResult<()> {
    let result = match plan {
        RunPlan::Install(plan) => run_install(plan).await,
        RunPlan::Run(plan) => run_bridge(*plan).await,
    };
    if let Err(err) = result.as_ref() {
        let class = err.failure_class();
        if class.is_warning() {
            warn!("Run finished with a {:?} warning: {}", class, err);
        } else {
            error!("Run failed ({:?}): {}", class, err);
        }
    }
    result
}

fn build_installer(settings: &ExecutorSettings, tool_path: PathBuf, timeout: Duration) -> AppResult<Installer> {
    let downloader = HttpDownloader::new(timeout)?;
    let probe = JavaToolProbe::new(settings.java.clone());
    Ok(ToolInstaller::new(tool_path, settings, downloader, probe))
}

async fn run_install(plan: InstallPlan) -> AppResult<()> {
    let installer = build_installer(&plan.settings, plan.tool_path, plan.timings.download_timeout)?;
    match installer.ensure_installed().await? {
        InstallOutcome::AlreadyInstalled => {
            info!("Grinder is already installed at {}", installer.tool_path().display());
        }
        InstallOutcome::Installed { url } => {
            info!("Grinder installed at {} from {}", installer.tool_path().display(), url);
        }
    }
    Ok(())
}

async fn run_bridge(plan: BridgePlan) -> AppResult<()> {
    let artifacts = ArtifactDir::create(&plan.artifacts_dir)?;
    let settings = plan.executor.settings.clone();
    let mut executor = GrinderExecutor::new(plan.executor, artifacts)?;
    let installer = build_installer(&settings, executor.tool_path().to_path_buf(), plan.timings.download_timeout)?;
    let working_dir = std::env::current_dir()?;
    let mut hooks = StageHooks::from_config(&plan.hooks, &working_dir, plan.timings.stop_grace);
    if hooks.is_empty() {
        debug!("No shell hooks configured");
    }

    let (shutdown_tx, mut shutdown_rx) = shutdown_channel();
    let signal_handle = setup_signal_shutdown_handler(&shutdown_tx);
    let mut totals = RunTotals::default();

    let driven = drive(
        &mut executor,
        &mut hooks,
        &installer,
        &mut shutdown_rx,
        &mut totals,
        plan.timings.poll_interval,
    )
    .await;

    let stopped = executor.stop().await;
    let hooks_stopped = hooks.shutdown().await;
    let final_pass = if executor.kpi_file().is_some() {
        executor.read_samples(true).map(|samples| totals.extend(samples))
    } else {
        Ok(())
    };
    let finalized = executor.finalize();
    let post_processed = hooks.post_process().await;
    match executor.resource_files() {
        Ok(files) if !files.is_empty() => debug!("Resource files: {}", files.join(", ")),
        Ok(_) => {}
        Err(err) => warn!("Cannot collect resource files: {}", err),
    }

    drop(shutdown_tx.send(()));
    signal_handle.await?;
    totals.log_summary();
    info!("Artifacts: {}", executor.artifacts().root().display());

    first_error([driven, stopped, hooks_stopped, final_pass, finalized, post_processed])
}

async fn drive(
    executor: &mut GrinderExecutor,
    hooks: &mut StageHooks,
    installer: &Installer,
    shutdown_rx: &mut ShutdownReceiver,
    totals: &mut RunTotals,
    poll_interval: Duration,
) -> AppResult<()> {
    hooks.prepare().await?;
    executor.prepare(installer).await?;
    if let Some(label) = executor.status_label() {
        info!("{}", label);
    }
    if shutdown_requested(shutdown_rx) {
        warn!("Shutdown requested before start");
        return Ok(());
    }

    hooks.startup().await?;
    executor.start()?;

    let mut interval = tokio::time::interval(poll_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                warn!("Shutdown requested, stopping Grinder");
                return Ok(());
            }
            _ = interval.tick() => {
                hooks.check().await?;
                let polled = executor.poll();
                totals.extend(executor.read_samples(false)?);
                if polled? == PollOutcome::Finished {
                    return Ok(());
                }
            }
        }
    }
}

/// Returns the first error; later ones are only logged.
fn first_error<const N: usize>(results: [AppResult<()>; N]) -> AppResult<()> {
    let mut first: Option<AppError> = None;
    for result in results {
        if let Err(err) = result {
            if first.is_none() {
                first = Some(err);
            } else {
                warn!("Additional failure during teardown: {}", err);
            }
        }
    }
    first.map_or(Ok(()), Err)
}
