//! Subprocess supervision for the load tool and shell hooks.
mod supervisor;

pub use supervisor::{CommandSpec, ProcessStatus, ProcessSupervisor};
