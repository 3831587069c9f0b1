//! Running a single command.
//!
//! The runner owns everything that happens around one external command:
//! the argv line goes to the ledger and the operator first, output is teed
//! while the command runs, an exit record follows, and the command's failure
//! policy decides whether a non-zero status ends the run.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::ExecutionError;
use super::launcher::Launcher;
use crate::core::command::{CommandSpec, FailurePolicy};
use crate::ledger::{OutputSink, RunLedger, Tee};

/// Exit code recorded when a program cannot be started.
pub const SPAWN_FAILURE_CODE: i32 = 127;

/// Result of a command that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit status; [`SPAWN_FAILURE_CODE`] if the program could not start.
    pub code: i32,
    /// Combined stdout and stderr. Empty for status-only commands.
    pub output: String,
    pub duration: Duration,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Runs commands through a [`Launcher`].
#[derive(Clone)]
pub struct CommandRunner {
    launcher: Arc<dyn Launcher>,
}

impl CommandRunner {
    pub fn new(launcher: Arc<dyn Launcher>) -> Self {
        Self { launcher }
    }

    /// Run one command to completion.
    ///
    /// Returns [`ExecutionError::CommandFailed`] when a command with the
    /// hard policy exits non-zero or cannot be started. Soft failures are
    /// recorded and returned as an unsuccessful [`CommandOutcome`].
    pub async fn run(
        &self,
        command: &CommandSpec,
        ledger: &mut RunLedger,
        operator: &mut dyn OutputSink,
    ) -> Result<CommandOutcome, ExecutionError> {
        let line = command.argv_line();
        info!(command = %line, "running");
        ledger.append(&line)?;
        operator.write_text(&line)?;

        let started = Instant::now();
        let mut tee = Tee::new().with(&mut *ledger).with(&mut *operator);
        let code = match self.launcher.launch(command, &mut tee).await {
            Ok(code) => code,
            Err(ExecutionError::Spawn { program, source }) => {
                tee.write_text(&format!("cannot start {program}: {source}"))?;
                SPAWN_FAILURE_CODE
            }
            Err(e) => return Err(e),
        };
        let output = tee.into_captured();
        let duration = started.elapsed();

        let record = format!("exit code {code} after {:.1}s", duration.as_secs_f64());
        ledger.append(&record)?;

        if code != 0 {
            match command.policy() {
                FailurePolicy::Hard => {
                    error!(command = %line, code, "command failed");
                    return Err(ExecutionError::CommandFailed {
                        command: line,
                        code,
                    });
                }
                FailurePolicy::Soft => {
                    warn!(command = %line, code, "non-critical command failed, continuing");
                    ledger.append("non-critical failure, continuing")?;
                }
            }
        }

        Ok(CommandOutcome {
            code,
            output,
            duration,
        })
    }
}
