//! Per-subject artifact workspace.
//!
//! Layout, relative to the base directory:
//!
//! ```text
//! m2m_<subject>/
//!     tmp/                 scratch, emptied by cleanup
//!     mask_prep/           masks and repaired surfaces
//!     eeg_positions/       electrode positions in subject space
//!     mri2mesh_log.html    run ledger
//! fs_<subject>/            surface reconstruction results
//! <subject>.msh            final head mesh
//! ```

pub mod cleanup;

use std::io;
use std::path::{Path, PathBuf};

use crate::core::types::SubjectId;
use crate::ledger::LEDGER_FILE_NAME;

/// The directory tree a run reads and writes.
///
/// Constructing a `Workspace` touches nothing on disk; [`Workspace::create`]
/// does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    subject: SubjectId,
    base: PathBuf,
    root: PathBuf,
}

impl Workspace {
    pub fn new(base: impl Into<PathBuf>, subject: &SubjectId) -> Self {
        let base = base.into();
        let root = base.join(format!("m2m_{}", subject));
        Self {
            subject: subject.clone(),
            base,
            root,
        }
    }

    pub fn subject(&self) -> &SubjectId {
        &self.subject
    }

    /// Directory containing the workspace.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `m2m_<subject>/`
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `m2m_<subject>/tmp/`
    pub fn scratch(&self) -> PathBuf {
        self.root.join("tmp")
    }

    /// `m2m_<subject>/mask_prep/`
    pub fn mask_prep(&self) -> PathBuf {
        self.root.join("mask_prep")
    }

    /// `m2m_<subject>/eeg_positions/`
    pub fn eeg_positions(&self) -> PathBuf {
        self.root.join("eeg_positions")
    }

    /// Name of the surface reconstruction subject, `fs_<subject>`.
    pub fn surfaces_name(&self) -> String {
        format!("fs_{}", self.subject)
    }

    /// `fs_<subject>/`, next to the workspace root.
    pub fn surfaces(&self) -> PathBuf {
        self.base.join(self.surfaces_name())
    }

    /// `<subject>.msh`, next to the workspace root.
    pub fn mesh(&self) -> PathBuf {
        self.base.join(format!("{}.msh", self.subject))
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE_NAME)
    }

    /// The fixed subdirectories, root first.
    pub fn directories(&self) -> [PathBuf; 4] {
        [
            self.root.clone(),
            self.scratch(),
            self.mask_prep(),
            self.eeg_positions(),
        ]
    }

    /// Create the workspace directories if absent.
    pub fn create(&self) -> io::Result<()> {
        for dir in self.directories() {
            std::fs::create_dir_all(&dir)?;
        }
        Ok(())
    }

    /// Whether the workspace root exists.
    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    /// Artifacts from `expected` that are not on disk.
    pub fn missing_artifacts<'a>(&self, expected: &'a [PathBuf]) -> Vec<&'a Path> {
        expected
            .iter()
            .filter(|path| !path.exists())
            .map(PathBuf::as_path)
            .collect()
    }

    /// Whether every expected artifact exists. An empty list never counts as
    /// present: a stage without declared outputs is always recomputed.
    pub fn all_present(&self, expected: &[PathBuf]) -> bool {
        !expected.is_empty() && self.missing_artifacts(expected).is_empty()
    }
}
