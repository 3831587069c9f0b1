//! Core identifier types for the orchestrator.
//!
//! These types provide type-safe identifiers for subjects, runs, and stages.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of the subject whose head mesh is being built.
///
/// The identifier names the workspace (`m2m_<subject>`), the surface
/// directory (`fs_<subject>`) and the final mesh (`<subject>.msh`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectId(String);

/// Unique identifier for one orchestration run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(Uuid);

/// The stages the orchestrator knows how to run.
///
/// Declaration order is execution order. `Brain` and `BrainForced` occupy
/// the same slot: a plan holds at most one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    /// Cortical surface reconstruction, reusing earlier results when allowed.
    Brain,
    /// Cortical surface reconstruction from scratch.
    #[serde(rename = "brainf")]
    BrainForced,
    /// Subcortical segmentation.
    #[serde(rename = "subcort")]
    Subcortical,
    /// Head-tissue (skin, skull) segmentation.
    Head,
    /// Tetrahedral volume meshing.
    #[serde(rename = "volumemesh")]
    VolumeMesh,
    /// Registration to MNI space and EEG positions.
    Mni,
    /// Visual check of the results.
    Check,
}

impl SubjectId {
    /// Create a new SubjectId from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SubjectId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SubjectId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl RunId {
    /// Generate a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a RunId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl StageKind {
    /// Every stage, in execution order.
    pub const ALL: [StageKind; 7] = [
        StageKind::Brain,
        StageKind::BrainForced,
        StageKind::Subcortical,
        StageKind::Head,
        StageKind::VolumeMesh,
        StageKind::Mni,
        StageKind::Check,
    ];

    /// The command-line name of the stage.
    pub fn name(&self) -> &'static str {
        match self {
            StageKind::Brain => "brain",
            StageKind::BrainForced => "brainf",
            StageKind::Subcortical => "subcort",
            StageKind::Head => "head",
            StageKind::VolumeMesh => "volumemesh",
            StageKind::Mni => "mni",
            StageKind::Check => "check",
        }
    }

    /// A short human-readable description used in stage banners.
    pub fn description(&self) -> &'static str {
        match self {
            StageKind::Brain => "cortical surface reconstruction",
            StageKind::BrainForced => "cortical surface reconstruction (forced)",
            StageKind::Subcortical => "subcortical segmentation",
            StageKind::Head => "head-tissue segmentation",
            StageKind::VolumeMesh => "volume meshing",
            StageKind::Mni => "MNI registration",
            StageKind::Check => "visual check",
        }
    }

    /// Whether this stage produces the cortical surfaces.
    pub fn is_brain(&self) -> bool {
        matches!(self, StageKind::Brain | StageKind::BrainForced)
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
