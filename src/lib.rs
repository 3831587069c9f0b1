//! mri2mesh - build a head mesh from structural MR images.
//!
//! The crate orchestrates external neuroimaging tools (surface
//! reconstruction, segmentation, surface repair, meshing, registration)
//! in a fixed order of stages, records every invocation and its output in
//! an append-only HTML ledger inside the subject's workspace, and keeps or
//! recomputes stage outputs on reruns.
//!
//! ```no_run
//! use mri2mesh::{Pipeline, RunRequestBuilder, StageFlags, Toolchain};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let request = RunRequestBuilder::new("P01")
//!     .images(["P01_T1.nii.gz", "P01_T1fs.nii.gz"])
//!     .flags(StageFlags { all: true, ..Default::default() })
//!     .build()?;
//!
//! let report = Pipeline::new(Toolchain::from_env()).run(&request).await?;
//! println!("run {} finished with status {}", report.run_id, report.exit_code());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod ledger;
pub mod planner;
pub mod stages;
pub mod testing;
pub mod workspace;

pub use config::{ConfigError, RunRequestBuilder, Tool, Toolchain};
pub use self::core::command::{CaptureMode, CommandSpec, CommandSpecBuilder, Effect, FailurePolicy};
pub use self::core::environment::Environment;
pub use self::core::request::{DEFAULT_VERTEX_COUNT, ImageRole, InputImages, RunRequest, StageFlags};
pub use self::core::stage::Stage;
pub use self::core::types::{RunId, StageKind, SubjectId};
pub use events::{Event, EventBus, EventHandler};
pub use execution::{
    CommandOutcome, CommandRunner, ExecutionError, Launcher, Pipeline, PipelineError,
    ProcessLauncher, RunOutcome, RunReport, StageExecutor, StageReport, StageStatus,
};
pub use ledger::{LedgerError, NullSink, OperatorSink, OutputSink, RunLedger, RunStatus, Tee};
pub use planner::{Plan, PlanError, Planner};
pub use stages::StageCatalog;
pub use workspace::Workspace;
pub use workspace::cleanup::{CleanupOutcome, clean_scratch};
