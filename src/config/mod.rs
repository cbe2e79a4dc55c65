//! Run file loading and executor settings.
mod loader;
mod parse;
pub(crate) mod paths;
mod profile;
pub mod types;

#[cfg(test)]
mod tests;

pub use loader::load_run_file;
pub use paths::{default_artifacts_dir, resolve_tool_path, resolve_user_path};
pub use profile::{LoadProfile, Timings};

#[cfg(test)]
pub(crate) use loader::load_run_file_at;
pub(crate) use parse::parse_duration_value;
