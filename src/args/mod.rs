//! CLI argument types.
mod cli;


pub use cli::{BridgeArgs, Command, InstallArgs};
