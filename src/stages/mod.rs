//! The stage catalog.
//!
//! Each stage module turns the request, the workspace layout and the
//! toolchain into a concrete [`Stage`]: the external commands to run, the
//! artifacts the stage leaves behind, and whether existing artifacts are
//! kept.

mod brain;
mod check;
mod head;
mod mni;
mod subcortical;
mod volume_mesh;

use std::path::{Path, PathBuf};

use crate::config::{Tool, Toolchain};
use crate::core::command::{CommandSpec, CommandSpecBuilder};
use crate::core::request::{ImageRole, RunRequest};
use crate::core::stage::Stage;
use crate::core::types::StageKind;
use crate::planner::PlanError;
use crate::workspace::Workspace;

/// Builds stages for one run.
pub struct StageCatalog<'a> {
    request: &'a RunRequest,
    workspace: &'a Workspace,
    toolchain: &'a Toolchain,
}

impl<'a> StageCatalog<'a> {
    pub fn new(request: &'a RunRequest, workspace: &'a Workspace, toolchain: &'a Toolchain) -> Self {
        Self {
            request,
            workspace,
            toolchain,
        }
    }

    /// Build the stage of the given kind.
    pub fn build(&self, kind: StageKind) -> Result<Stage, PlanError> {
        match kind {
            StageKind::Brain => brain::stage(self, false),
            StageKind::BrainForced => brain::stage(self, true),
            StageKind::Subcortical => Ok(subcortical::stage(self)),
            StageKind::Head => head::stage(self),
            StageKind::VolumeMesh => Ok(volume_mesh::stage(self)),
            StageKind::Mni => mni::stage(self),
            StageKind::Check => Ok(check::stage(self)),
        }
    }

    pub fn request(&self) -> &'a RunRequest {
        self.request
    }

    pub fn workspace(&self) -> &'a Workspace {
        self.workspace
    }

    pub fn toolchain(&self) -> &'a Toolchain {
        self.toolchain
    }

    /// Start a command for a tool, using the configured program.
    fn command(&self, tool: Tool) -> CommandSpecBuilder {
        CommandSpec::builder(self.toolchain.program(tool))
    }

    fn image(&self, stage: StageKind, role: ImageRole) -> Result<&'a Path, PlanError> {
        self.request
            .images()
            .get(role)
            .ok_or(PlanError::MissingImage { stage, role })
    }

    fn keep_masks(&self) -> bool {
        self.request.flags().keep_masks
    }

    /// T1fs resampled into the surface reconstruction's space.
    fn conformed_t1fs(&self) -> PathBuf {
        self.workspace.root().join("T1fs_conform.nii.gz")
    }
}
