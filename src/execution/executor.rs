//! Stage execution.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::ExecutionError;
use super::runner::CommandRunner;
use crate::core::command::CommandSpec;
use crate::core::stage::Stage;
use crate::core::types::StageKind;
use crate::events::{Event, EventBus};
use crate::ledger::{OutputSink, RunLedger};
use crate::workspace::Workspace;

/// How a stage ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    /// Every command ran.
    Completed,
    /// Outputs were kept; only read-only commands ran.
    Skipped,
}

/// Result of a stage that did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub kind: StageKind,
    pub status: StageStatus,
    /// Number of commands executed.
    pub commands_run: usize,
    /// Number of soft commands that exited non-zero.
    pub soft_failures: usize,
    pub duration: Duration,
}

/// Executes stages one command at a time.
pub struct StageExecutor {
    runner: CommandRunner,
    events: Arc<EventBus>,
}

impl StageExecutor {
    pub fn new(runner: CommandRunner, events: Arc<EventBus>) -> Self {
        Self { runner, events }
    }

    /// Execute a stage.
    ///
    /// When the stage keeps its outputs and all of them exist, only its
    /// read-only commands run. Otherwise the stage's reset directories are
    /// removed and every command runs in order. A hard command failure is
    /// returned immediately; nothing already produced is rolled back.
    pub async fn execute(
        &self,
        stage: &Stage,
        workspace: &Workspace,
        ledger: &mut RunLedger,
        operator: &mut dyn OutputSink,
    ) -> Result<StageReport, ExecutionError> {
        let kind = stage.kind();
        let started = Instant::now();

        let title = format!("{}: {}", kind, kind.description());
        ledger.banner(&title)?;
        operator.write_text(&format!("==== {title} ===="))?;
        self.events.emit(Event::stage_started(kind)).await;

        let skip = stage.should_skip(workspace);
        let commands: Vec<&CommandSpec> = if skip {
            info!(stage = %kind, "outputs present, keeping them");
            ledger.append("outputs present, keeping them")?;
            self.events.emit(Event::stage_skipped(kind)).await;
            stage.read_only_commands().collect()
        } else {
            for dir in stage.reset_dirs() {
                reset(dir, ledger)?;
            }
            stage.commands().iter().collect()
        };

        let mut soft_failures = 0;
        for command in &commands {
            let command_started = Instant::now();
            let outcome = match self.runner.run(command, ledger, operator).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if let Some(code) = e.command_code() {
                        let event = Event::command_finished(
                            kind,
                            command.argv_line(),
                            code,
                            command_started.elapsed(),
                        );
                        self.events.emit(event).await;
                    }
                    return Err(e);
                }
            };
            self.events
                .emit(Event::command_finished(
                    kind,
                    command.argv_line(),
                    outcome.code,
                    outcome.duration,
                ))
                .await;
            if !outcome.success() {
                soft_failures += 1;
            }
        }

        let duration = started.elapsed();
        self.events
            .emit(Event::stage_completed(kind, duration))
            .await;
        debug!(stage = %kind, commands = commands.len(), soft_failures, "stage done");

        Ok(StageReport {
            kind,
            status: if skip {
                StageStatus::Skipped
            } else {
                StageStatus::Completed
            },
            commands_run: commands.len(),
            soft_failures,
            duration,
        })
    }
}

fn reset(dir: &Path, ledger: &mut RunLedger) -> Result<(), ExecutionError> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            info!(path = %dir.display(), "removed previous results");
            ledger.append(&format!("removed {}", dir.display()))?;
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ExecutionError::Reset {
            path: dir.to_path_buf(),
            source,
        }),
    }
}
