//! Stage planning.
//!
//! The [`Planner`] turns the stage flags of a [`RunRequest`] into an ordered
//! [`Plan`]. Planning is pure: it checks that the images each selected stage
//! needs were supplied, but it never touches the filesystem.

use thiserror::Error;
use tracing::warn;

use crate::core::request::{ImageRole, RunRequest};
use crate::core::types::StageKind;

/// Errors detected while planning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A selected stage needs an image that was not supplied.
    #[error("stage '{stage}' needs the {role} image, which was not given")]
    MissingImage { stage: StageKind, role: ImageRole },
}

impl PlanError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            PlanError::MissingImage { .. } => 2,
        }
    }
}

/// The ordered work of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    stages: Vec<StageKind>,
    cleanup: bool,
    warnings: Vec<String>,
}

impl Plan {
    /// Stages to execute, in order.
    pub fn stages(&self) -> &[StageKind] {
        &self.stages
    }

    /// Whether the scratch directory is emptied after the last stage.
    pub fn cleanup(&self) -> bool {
        self.cleanup
    }

    /// Warnings about flags that have no effect.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.stages.contains(&kind)
    }
}

/// Builds plans from run requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Planner {
    /// Plan the stages selected by a request.
    pub fn plan(request: &RunRequest) -> Result<Plan, PlanError> {
        let flags = request.flags();

        let mut selected = Vec::with_capacity(StageKind::ALL.len());
        if flags.brainf {
            selected.push(StageKind::BrainForced);
        } else if flags.brain || flags.all {
            selected.push(StageKind::Brain);
        }
        if flags.subcort || flags.all {
            selected.push(StageKind::Subcortical);
        }
        if flags.head || flags.all {
            selected.push(StageKind::Head);
        }
        if flags.volumemesh || flags.all {
            selected.push(StageKind::VolumeMesh);
        }
        if flags.mni || flags.all {
            selected.push(StageKind::Mni);
        }
        if flags.check {
            selected.push(StageKind::Check);
        }

        let mut plan = Plan {
            cleanup: !(flags.check || flags.qc || flags.nocleanup),
            stages: selected,
            warnings: Vec::new(),
        };

        for &stage in &plan.stages {
            for role in required_images(request, stage) {
                if !request.images().has(role) {
                    return Err(PlanError::MissingImage { stage, role });
                }
            }
        }

        plan.warnings = ineffective_flags(request, &plan);
        for warning in &plan.warnings {
            warn!("{}", warning);
        }

        Ok(plan)
    }
}

/// Images a stage cannot run without, given the request's flags.
pub fn required_images(request: &RunRequest, stage: StageKind) -> Vec<ImageRole> {
    let flags = request.flags();
    match stage {
        StageKind::Brain | StageKind::BrainForced => {
            let mut roles = vec![ImageRole::T1, ImageRole::T1Fs];
            if flags.t2pial {
                roles.push(ImageRole::T2);
            }
            roles
        }
        StageKind::Head => {
            let mut roles = vec![ImageRole::T1Fs];
            if flags.t2mask {
                roles.push(ImageRole::T2);
            }
            roles
        }
        StageKind::Mni => vec![ImageRole::T1],
        StageKind::Subcortical | StageKind::VolumeMesh | StageKind::Check => Vec::new(),
    }
}

fn ineffective_flags(request: &RunRequest, plan: &Plan) -> Vec<String> {
    let flags = request.flags();
    let mut warnings = Vec::new();

    if plan.is_empty() {
        warnings.push(format!(
            "no stage selected for subject '{}'; nothing to do",
            request.subject()
        ));
        return warnings;
    }

    let has_brain = plan.contains(StageKind::Brain) || plan.contains(StageKind::BrainForced);
    if flags.t2pial && !has_brain {
        warnings.push("--t2pial has no effect without --brain or --brainf".to_string());
    }
    if flags.t2mask && !plan.contains(StageKind::Head) {
        warnings.push("--t2mask has no effect without --head".to_string());
    }
    if flags.mnimaskskull && !plan.contains(StageKind::Mni) {
        warnings.push("--mnimaskskull has no effect without --mni".to_string());
    }
    if flags.qc && !plan.contains(StageKind::Check) {
        warnings.push("--qc has no effect without --check".to_string());
    }
    if flags.cache && plan.contains(StageKind::BrainForced) {
        warnings.push("--cache is ignored with --brainf".to_string());
    } else if flags.cache && !has_brain {
        warnings.push("--cache has no effect without --brain".to_string());
    }

    warnings
}
