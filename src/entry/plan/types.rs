use std::path::PathBuf;

use grinder_bridge::config::Timings;
use grinder_bridge::config::types::{ExecutorSettings, HooksConfig};
use grinder_bridge::executor::ExecutorConfig;

pub(in crate::entry) struct InstallPlan {
    pub(super) settings: ExecutorSettings,
    pub(super) tool_path: PathBuf,
    pub(super) timings: Timings,
}

pub(in crate::entry) struct BridgePlan {
    pub(super) executor: ExecutorConfig,
    pub(super) hooks: HooksConfig,
    pub(super) artifacts_dir: PathBuf,
    pub(super) timings: Timings,
}

pub(in crate::entry) enum RunPlan {
    Install(InstallPlan),
    Run(Box<BridgePlan>),
}
