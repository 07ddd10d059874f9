//! dbfixture Store - everything that talks to an external program
//!
//! Provides:
//! - An async command runner over the container engine and SQL client CLIs
//! - A SQL executor backed by `sqlcmd`
//! - The local-engine catalog manager
//! - Seed script loading and batch splitting

#![allow(clippy::result_large_err)]

pub mod errors;
pub mod local;
pub mod process;
pub mod scripts;
pub mod sql;

// Re-export key types
pub use errors::Result;
pub use local::LocalInstanceManager;
pub use process::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use sql::{SqlExecutor, SqlcmdExecutor};
