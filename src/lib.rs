//! Core library for the `grinder-bridge` CLI.
//!
//! The crate drives The Grinder load tool as a subprocess: it installs the
//! tool on demand, writes the run properties, supervises the process and tails
//! its KPI log into normalized [`results::Sample`] records. The binary wires
//! these pieces into a single poll loop; library APIs may evolve with it.
pub mod args;
pub mod config;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod install;
pub mod process;
pub mod results;
