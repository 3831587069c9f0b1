//! The run driver.
//!
//! [`Pipeline::run`] takes one [`RunRequest`] through planning, workspace
//! creation, stage execution and cleanup:
//!
//! ```text
//! Start -> PlanStages -> ExecuteStage* -> Cleanup? -> Finish
//!                             |
//!                             +-> (hard failure) -> AbortedFinish
//! ```
//!
//! Failures before the ledger exists are returned as [`PipelineError`].
//! Once the ledger is open, every path ends with a closing record and a
//! [`RunReport`].

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{Instrument, error, info, info_span, warn};

use super::ExecutionError;
use super::executor::{StageExecutor, StageReport};
use super::launcher::{Launcher, ProcessLauncher};
use super::runner::CommandRunner;
use crate::config::Toolchain;
use crate::core::request::RunRequest;
use crate::core::stage::Stage;
use crate::core::types::{RunId, StageKind};
use crate::events::{Event, EventBus};
use crate::ledger::{LedgerError, OperatorSink, OutputSink, RunLedger, RunStatus};
use crate::planner::{PlanError, Planner};
use crate::stages::StageCatalog;
use crate::workspace::Workspace;
use crate::workspace::cleanup::{self, CleanupOutcome};

/// Errors that end a run before its ledger is open.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error("cannot create workspace '{path}': {source}")]
    Workspace {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl PipelineError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Plan(e) => e.exit_code(),
            PipelineError::Workspace { .. } | PipelineError::Ledger(_) => 1,
        }
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every planned stage finished.
    Completed,
    /// No stage was selected.
    NothingToDo,
    /// A hard failure ended the run during a stage.
    Aborted {
        stage: StageKind,
        error: ExecutionError,
    },
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcome: RunOutcome,
    /// Reports of the stages that finished, in execution order.
    pub stages: Vec<StageReport>,
    /// `None` when cleanup was not part of the plan or did not run.
    pub cleanup: Option<CleanupOutcome>,
    pub duration: Duration,
    /// `None` for runs that had nothing to do.
    pub ledger_path: Option<PathBuf>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, RunOutcome::Aborted { .. })
    }

    /// Process exit status for this run.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() { 0 } else { 1 }
    }
}

/// Drives runs from request to closing record.
///
/// # Example
///
/// ```no_run
/// use mri2mesh::{Pipeline, RunRequestBuilder, StageFlags, Toolchain};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let request = RunRequestBuilder::new("P01")
///     .images(["P01_T1.nii.gz", "P01_T1fs.nii.gz"])
///     .flags(StageFlags { brain: true, ..Default::default() })
///     .build()?;
///
/// let report = Pipeline::new(Toolchain::from_env()).run(&request).await?;
/// std::process::exit(report.exit_code().into());
/// # }
/// ```
pub struct Pipeline {
    toolchain: Toolchain,
    launcher: Arc<dyn Launcher>,
    events: Arc<EventBus>,
    operator: Box<dyn OutputSink>,
}

impl Pipeline {
    /// A pipeline running real processes and writing to stdout.
    pub fn new(toolchain: Toolchain) -> Self {
        Self {
            toolchain,
            launcher: Arc::new(ProcessLauncher::new()),
            events: Arc::new(EventBus::new()),
            operator: Box::new(OperatorSink::stdout()),
        }
    }

    /// Builder: use a different launcher.
    pub fn with_launcher(mut self, launcher: Arc<dyn Launcher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Builder: share an event bus.
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = events;
        self
    }

    /// Builder: send operator output somewhere else.
    pub fn with_operator(mut self, operator: impl OutputSink + 'static) -> Self {
        self.operator = Box::new(operator);
        self
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Run a request to completion.
    pub async fn run(&mut self, request: &RunRequest) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let run_id = RunId::new();

        let plan = Planner::plan(request)?;
        if plan.is_empty() {
            info!(subject = %request.subject(), "nothing to do");
            return Ok(RunReport {
                run_id,
                outcome: RunOutcome::NothingToDo,
                stages: Vec::new(),
                cleanup: None,
                duration: started.elapsed(),
                ledger_path: None,
            });
        }

        let workspace = Workspace::new(request.base_dir(), request.subject());
        let catalog = StageCatalog::new(request, &workspace, &self.toolchain);
        let stages = plan
            .stages()
            .iter()
            .map(|&kind| catalog.build(kind))
            .collect::<Result<Vec<Stage>, PlanError>>()?;

        workspace
            .create()
            .map_err(|source| PipelineError::Workspace {
                path: workspace.root().to_path_buf(),
                source,
            })?;
        let mut ledger = RunLedger::open(workspace.ledger_path(), request.subject(), &run_id)?;
        let ledger_path = ledger.path().to_path_buf();

        info!(
            run_id = %run_id,
            subject = %request.subject(),
            stages = ?plan.stages(),
            "run started"
        );
        self.events
            .emit(Event::run_started(
                run_id.clone(),
                request.subject().clone(),
                plan.stages().to_vec(),
            ))
            .await;
        for warning in plan.warnings() {
            ledger.append(&format!("warning: {warning}"))?;
        }

        let executor = StageExecutor::new(
            CommandRunner::new(self.launcher.clone()),
            self.events.clone(),
        );
        let operator = self.operator.as_mut();

        let mut reports = Vec::with_capacity(stages.len());
        let mut aborted = None;
        for stage in &stages {
            let span = info_span!("stage", stage = %stage.kind());
            match executor
                .execute(stage, &workspace, &mut ledger, &mut *operator)
                .instrument(span)
                .await
            {
                Ok(report) => reports.push(report),
                Err(error) => {
                    aborted = Some((stage.kind(), error));
                    break;
                }
            }
        }

        if let Some((stage, error)) = aborted {
            error!(stage = %stage, error = %error, "run aborted");
            let message = format!("{error}; exiting");
            // Operator errors are only logged here; the ledger still gets closed.
            if let Err(e) = operator.write_text(&message) {
                warn!(error = %e, "cannot write to operator");
            }
            ledger.append(&message)?;
            let duration = ledger.close(RunStatus::Aborted)?;
            self.events
                .emit(Event::run_finished(run_id.clone(), false, duration))
                .await;
            return Ok(RunReport {
                run_id,
                outcome: RunOutcome::Aborted { stage, error },
                stages: reports,
                cleanup: None,
                duration: started.elapsed(),
                ledger_path: Some(ledger_path),
            });
        }

        let cleanup = if plan.cleanup() {
            match cleanup::clean_scratch(&workspace) {
                Ok(outcome) => {
                    let removed = match outcome {
                        CleanupOutcome::Removed(count) => count,
                        CleanupOutcome::AlreadyEmpty => 0,
                    };
                    ledger.append(&format!("cleanup: removed {removed} scratch entries"))?;
                    self.events.emit(Event::cleanup_finished(removed)).await;
                    Some(outcome)
                }
                Err(e) => {
                    warn!(error = %e, "cleanup failed, scratch files left in place");
                    ledger.append(&format!("cleanup failed: {e}"))?;
                    None
                }
            }
        } else {
            info!("keeping scratch directory");
            None
        };

        let duration = ledger.close(RunStatus::Completed)?;
        info!(run_id = %run_id, duration_secs = duration.as_secs_f64(), "run completed");
        self.events
            .emit(Event::run_finished(run_id.clone(), true, duration))
            .await;

        Ok(RunReport {
            run_id,
            outcome: RunOutcome::Completed,
            stages: reports,
            cleanup,
            duration: started.elapsed(),
            ledger_path: Some(ledger_path),
        })
    }
}
