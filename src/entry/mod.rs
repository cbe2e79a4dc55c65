mod plan;
mod totals;

use std::ffi::OsString;
use std::path::Path;

use clap::{CommandFactory, FromArgMatches};
use grinder_bridge::args::BridgeArgs;
use grinder_bridge::error::AppResult;

use plan::{build_plan, execute_plan};

/// Default run files checked when no CLI args are provided.
const DEFAULT_RUN_FILES: [&str; 2] = ["grinder.toml", "grinder.json"];

pub(crate) fn run() -> AppResult<()> {
    let Some(args) = parse_args()? else {
        return Ok(());
    };

    crate::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let plan = build_plan(args)?;
        execute_plan(plan).await
    })
}

fn parse_args() -> AppResult<Option<BridgeArgs>> {
    let mut cmd = BridgeArgs::command();
    let raw_args: Vec<OsString> = std::env::args_os().collect();

    if should_show_help(&raw_args) {
        cmd.print_help()?;
        println!();
        return Ok(None);
    }

    let matches = cmd.get_matches_from(raw_args);
    let args = BridgeArgs::from_arg_matches(&matches)?;
    Ok(Some(args))
}

fn should_show_help(raw_args: &[OsString]) -> bool {
    let treat_as_empty =
        matches!(raw_args, [] | [_]) || matches!(raw_args, [_, second] if second == "--");
    if !treat_as_empty {
        return false;
    }

    !DEFAULT_RUN_FILES.iter().any(|path| Path::new(path).exists())
}
