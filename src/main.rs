//! mri2mesh - build a head mesh from structural MR images.
//!
//! Usage:
//!   mri2mesh [flags] <subject> [T1 [T1fs [T2 T2fs]]]
//!
//! Command output and stage banners go to stdout; diagnostics go to stderr
//! and follow `RUST_LOG`.

use clap::Parser;
use mri2mesh::{
    ConfigError, Event, EventBus, EventHandler, Pipeline, RunOutcome, RunRequest,
    RunRequestBuilder, StageFlags, Toolchain,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// mri2mesh - build a head mesh from structural MR images
#[derive(Parser)]
#[command(name = "mri2mesh")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subject identifier; results go to m2m_<subject>/
    #[arg(value_name = "SUBJECT")]
    subject: String,

    /// Input images in order T1, T1fs, T2, T2fs (0, 1, 2 or 4 paths)
    #[arg(value_name = "IMAGES")]
    images: Vec<PathBuf>,

    /// Run brain, subcort, head, volumemesh and mni
    #[arg(long)]
    all: bool,

    /// Reconstruct the cortical surfaces
    #[arg(long)]
    brain: bool,

    /// Reconstruct the cortical surfaces, discarding earlier results
    #[arg(long)]
    brainf: bool,

    /// Segment subcortical structures
    #[arg(long)]
    subcort: bool,

    /// Extract skin and skull surfaces
    #[arg(long)]
    head: bool,

    /// Build the tetrahedral head mesh
    #[arg(long)]
    volumemesh: bool,

    /// Register to MNI space and transform EEG positions
    #[arg(long)]
    mni: bool,

    /// Also warp the skull mask to MNI space
    #[arg(long)]
    mnimaskskull: bool,

    /// Open the results in a viewer
    #[arg(short = 'c', long)]
    check: bool,

    /// Reuse existing surface reconstruction results
    #[arg(long)]
    cache: bool,

    /// With --check, write screenshots instead of opening a viewer
    #[arg(long)]
    qc: bool,

    /// Keep the scratch directory
    #[arg(long)]
    nocleanup: bool,

    /// Keep stage outputs that already exist
    #[arg(long = "keep_masks")]
    keep_masks: bool,

    /// Use the T2 image to refine the pial surfaces
    #[arg(long)]
    t2pial: bool,

    /// Use the T2 image for the skin and skull masks
    #[arg(long)]
    t2mask: bool,

    /// Number of vertices of each repaired surface
    #[arg(
        long,
        default_value_t = mri2mesh::DEFAULT_VERTEX_COUNT,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    numvertices: u32,
}

impl Cli {
    fn flags(&self) -> StageFlags {
        StageFlags {
            all: self.all,
            brain: self.brain,
            brainf: self.brainf,
            subcort: self.subcort,
            head: self.head,
            volumemesh: self.volumemesh,
            mni: self.mni,
            check: self.check,
            qc: self.qc,
            cache: self.cache,
            keep_masks: self.keep_masks,
            t2pial: self.t2pial,
            t2mask: self.t2mask,
            mnimaskskull: self.mnimaskskull,
            nocleanup: self.nocleanup,
        }
    }

    fn into_request(self) -> Result<RunRequest, ConfigError> {
        let flags = self.flags();
        RunRequestBuilder::new(self.subject)
            .images(self.images)
            .flags(flags)
            .vertex_count(self.numvertices)
            .build()
    }
}

/// Logs lifecycle events.
struct LoggingHandler;

#[async_trait::async_trait]
impl EventHandler for LoggingHandler {
    async fn handle(&self, event: &Event) {
        match event {
            Event::RunStarted {
                run_id,
                subject,
                stages,
                ..
            } => {
                let names: Vec<&str> = stages.iter().map(|s| s.name()).collect();
                info!("Run {} for '{}': {}", run_id, subject, names.join(", "));
            }
            Event::StageStarted { stage, .. } => {
                info!("Stage '{}' started", stage);
            }
            Event::StageSkipped { stage, .. } => {
                info!("Stage '{}': outputs kept", stage);
            }
            Event::CommandFinished {
                command, exit_code, ..
            } if *exit_code != 0 => {
                warn!("  '{}' exited with {}", command, exit_code);
            }
            Event::StageCompleted { stage, duration, .. } => {
                info!("Stage '{}' finished in {:.1}s", stage, duration.as_secs_f64());
            }
            Event::CleanupFinished { removed, .. } => {
                info!("Scratch directory cleaned ({} entries)", removed);
            }
            Event::RunFinished {
                success, duration, ..
            } => {
                if *success {
                    info!("Run completed in {:.1}s", duration.as_secs_f64());
                } else {
                    error!("Run aborted after {:.1}s", duration.as_secs_f64());
                }
            }
            _ => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let request = match cli.into_request() {
        Ok(request) => request,
        Err(e) => {
            eprintln!("mri2mesh: {e}; exiting");
            return ExitCode::from(e.exit_code());
        }
    };

    let events = Arc::new(EventBus::new());
    events.register(Arc::new(LoggingHandler)).await;
    let mut pipeline = Pipeline::new(Toolchain::from_env()).with_event_bus(events);

    match pipeline.run(&request).await {
        Ok(report) => {
            match &report.outcome {
                RunOutcome::NothingToDo => {
                    warn!("No stage selected; see --help for the stage flags");
                }
                RunOutcome::Aborted { stage, .. } => {
                    if let Some(path) = &report.ledger_path {
                        error!("Stage '{}' failed; see {}", stage, path.display());
                    }
                }
                RunOutcome::Completed => {}
            }
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            eprintln!("mri2mesh: {e}; exiting");
            ExitCode::from(e.exit_code())
        }
    }
}
