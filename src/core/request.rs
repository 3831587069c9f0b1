//! The resolved configuration of one invocation.
//!
//! A [`RunRequest`] is built once from the command line by
//! [`RunRequestBuilder`](crate::config::RunRequestBuilder) and only read
//! afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use super::types::SubjectId;

/// Default number of vertices of the repaired head surfaces.
pub const DEFAULT_VERTEX_COUNT: u32 = 60_000;

/// The role of an input MR volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageRole {
    /// T1-weighted.
    T1,
    /// T1-weighted with fat suppression.
    T1Fs,
    /// T2-weighted.
    T2,
    /// T2-weighted with fat suppression.
    T2Fs,
}

impl ImageRole {
    /// Positional order of the image arguments.
    pub const POSITIONAL: [ImageRole; 4] =
        [ImageRole::T1, ImageRole::T1Fs, ImageRole::T2, ImageRole::T2Fs];

    pub fn name(&self) -> &'static str {
        match self {
            ImageRole::T1 => "T1",
            ImageRole::T1Fs => "T1fs",
            ImageRole::T2 => "T2",
            ImageRole::T2Fs => "T2fs",
        }
    }
}

impl fmt::Display for ImageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The input MR volumes, each optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputImages {
    t1: Option<PathBuf>,
    t1fs: Option<PathBuf>,
    t2: Option<PathBuf>,
    t2fs: Option<PathBuf>,
}

impl InputImages {
    /// No images.
    pub fn none() -> Self {
        Self::default()
    }

    /// Assign positional paths to roles in order T1, T1fs, T2, T2fs.
    ///
    /// Returns `None` for counts other than 0, 1, 2 or 4.
    pub fn from_positional(paths: Vec<PathBuf>) -> Option<Self> {
        if !matches!(paths.len(), 0 | 1 | 2 | 4) {
            return None;
        }
        let mut images = Self::none();
        for (role, path) in ImageRole::POSITIONAL.into_iter().zip(paths) {
            images = images.with(role, path);
        }
        Some(images)
    }

    /// Builder: set the image for a role.
    pub fn with(mut self, role: ImageRole, path: impl Into<PathBuf>) -> Self {
        *self.slot_mut(role) = Some(path.into());
        self
    }

    /// Get the image for a role.
    pub fn get(&self, role: ImageRole) -> Option<&Path> {
        match role {
            ImageRole::T1 => self.t1.as_deref(),
            ImageRole::T1Fs => self.t1fs.as_deref(),
            ImageRole::T2 => self.t2.as_deref(),
            ImageRole::T2Fs => self.t2fs.as_deref(),
        }
    }

    pub fn has(&self, role: ImageRole) -> bool {
        self.get(role).is_some()
    }

    /// Number of images supplied.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Iterate over the supplied images in positional order.
    pub fn iter(&self) -> impl Iterator<Item = (ImageRole, &Path)> {
        ImageRole::POSITIONAL
            .into_iter()
            .filter_map(|role| self.get(role).map(|path| (role, path)))
    }

    fn slot_mut(&mut self, role: ImageRole) -> &mut Option<PathBuf> {
        match role {
            ImageRole::T1 => &mut self.t1,
            ImageRole::T1Fs => &mut self.t1fs,
            ImageRole::T2 => &mut self.t2,
            ImageRole::T2Fs => &mut self.t2fs,
        }
    }
}

/// Stage selection and behavior flags, one per command-line switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    /// Shorthand for brain, subcort, head, volumemesh and mni.
    pub all: bool,
    pub brain: bool,
    /// Recompute the cortical surfaces even if they exist.
    pub brainf: bool,
    pub subcort: bool,
    pub head: bool,
    pub volumemesh: bool,
    pub mni: bool,
    /// Open the results in the viewer.
    pub check: bool,
    /// Write QC screenshots during the check stage.
    pub qc: bool,
    /// Reuse an existing surface reconstruction.
    pub cache: bool,
    /// Keep stage outputs that already exist.
    pub keep_masks: bool,
    /// Use the T2 image to refine the pial surfaces.
    pub t2pial: bool,
    /// Use the T2 image for the head masks.
    pub t2mask: bool,
    /// Warp the skull mask to MNI space as well.
    pub mnimaskskull: bool,
    /// Keep the scratch directory.
    pub nocleanup: bool,
}

impl StageFlags {
    /// Whether any stage is selected at all.
    pub fn selects_any_stage(&self) -> bool {
        self.all
            || self.brain
            || self.brainf
            || self.subcort
            || self.head
            || self.volumemesh
            || self.mni
            || self.check
    }
}

/// One invocation's resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub(crate) subject: SubjectId,
    pub(crate) base_dir: PathBuf,
    pub(crate) images: InputImages,
    pub(crate) flags: StageFlags,
    pub(crate) vertex_count: NonZeroU32,
}

impl RunRequest {
    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Directory holding `m2m_<subject>/` and `fs_<subject>/`.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn images(&self) -> &InputImages {
        &self.images
    }

    pub fn flags(&self) -> &StageFlags {
        &self.flags
    }

    pub fn vertex_count(&self) -> NonZeroU32 {
        self.vertex_count
    }

    /// Whether the request selects no stage.
    pub fn is_noop(&self) -> bool {
        !self.flags.selects_any_stage()
    }
}
