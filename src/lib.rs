//! stowage: command dispatcher for a storage-management CLI.
//!
//! Every invocation flows through the same path: the [`cli::CommandTree`]
//! resolves argv to one command, the [`lifecycle`] pipeline prepares
//! configuration, logging, permissions and the storage client, then the
//! command's action runs. Early exits travel back as [`signal::Abort`] values
//! and the [`runner::Runner`] turns them into a process exit code.

pub mod build_info;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod invocation;
pub mod lifecycle;
pub mod logging;
pub mod permission;
pub mod presenter;
pub mod runner;
pub mod signal;
#[cfg(test)]
pub mod testsupport;
