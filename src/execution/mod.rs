//! Command and stage execution.
//!
//! Layers, from the bottom up:
//!
//! - [`Launcher`]: starts one process and streams its output
//! - [`CommandRunner`]: ledger bookkeeping and failure policy for one command
//! - [`StageExecutor`]: skip decision and command sequencing for one stage
//! - [`Pipeline`]: the whole run, from planning to the closing record

mod executor;
mod launcher;
mod pipeline;
mod runner;

pub use executor::{StageExecutor, StageReport, StageStatus};
pub use launcher::{Launcher, ProcessLauncher};
pub use pipeline::{Pipeline, PipelineError, RunOutcome, RunReport};
pub use runner::{CommandOutcome, CommandRunner, SPAWN_FAILURE_CODE};

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors raised while executing commands and stages.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The program could not be started.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A command with the hard failure policy exited with a non-zero status.
    #[error("command failed with exit code {code}: {command}")]
    CommandFailed { command: String, code: i32 },

    /// The ledger could not be written.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A stage directory could not be removed before recomputation.
    #[error("cannot reset '{path}': {source}")]
    Reset {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Command output could not be forwarded.
    #[error("cannot write command output: {0}")]
    Output(#[from] io::Error),
}

impl ExecutionError {
    /// Exit code of the failed command, if this error is a command failure.
    pub fn command_code(&self) -> Option<i32> {
        match self {
            ExecutionError::CommandFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
