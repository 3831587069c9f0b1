//! Stage descriptions.
//!
//! A [`Stage`] is the unit the executor runs: an ordered list of commands
//! plus what the stage is expected to produce. Whether a stage may be
//! skipped is decided by [`Stage::should_skip`], a pure check over the
//! workspace that never runs anything.

use std::path::PathBuf;

use super::command::CommandSpec;
use super::types::StageKind;
use crate::workspace::Workspace;

/// One named phase of mesh construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    kind: StageKind,
    commands: Vec<CommandSpec>,
    artifacts: Vec<PathBuf>,
    reset_dirs: Vec<PathBuf>,
    preserve: bool,
}

impl Stage {
    /// Create an empty stage.
    pub fn new(kind: StageKind) -> Self {
        Self {
            kind,
            commands: Vec::new(),
            artifacts: Vec::new(),
            reset_dirs: Vec::new(),
            preserve: false,
        }
    }

    /// Builder: append a command.
    pub fn command(mut self, command: CommandSpec) -> Self {
        self.commands.push(command);
        self
    }

    /// Builder: declare an output artifact.
    pub fn artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifacts.push(path.into());
        self
    }

    /// Builder: remove a directory before the mutating commands run.
    pub fn reset_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.reset_dirs.push(path.into());
        self
    }

    /// Builder: keep existing outputs instead of recomputing them.
    pub fn preserve(mut self, preserve: bool) -> Self {
        self.preserve = preserve;
        self
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// All commands, in execution order.
    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    /// Commands that still run when the stage is skipped.
    pub fn read_only_commands(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.iter().filter(|c| !c.is_mutating())
    }

    /// Expected output artifacts.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    pub fn reset_dirs(&self) -> &[PathBuf] {
        &self.reset_dirs
    }

    pub fn preserves_outputs(&self) -> bool {
        self.preserve
    }

    /// Whether the stage's mutating commands can be skipped: the caller
    /// asked to preserve outputs and every declared artifact exists.
    pub fn should_skip(&self, workspace: &Workspace) -> bool {
        self.preserve && workspace.all_present(&self.artifacts)
    }
}
