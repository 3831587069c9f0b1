//! Common test utilities shared across integration tests.

use mri2mesh::testing::ScriptedLauncher;
use mri2mesh::{NullSink, Pipeline, RunRequest, RunRequestBuilder, StageFlags, Toolchain};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary study directory holding the input images of subject `P01`.
pub struct Study {
    dir: TempDir,
}

impl Study {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// The first `count` positional images, created on demand.
    pub fn images(&self, count: usize) -> Vec<PathBuf> {
        ["P01_T1.nii.gz", "P01_T1fs.nii.gz", "P01_T2.nii.gz", "P01_T2fs.nii.gz"]
            .iter()
            .take(count)
            .map(|name| {
                let path = self.path().join(name);
                fs::write(&path, b"nifti").unwrap();
                path
            })
            .collect()
    }

    /// A request for `P01` with the given flags and images.
    pub fn request(&self, flags: StageFlags, image_count: usize) -> RunRequest {
        RunRequestBuilder::new("P01")
            .base_dir(self.path())
            .images(self.images(image_count))
            .flags(flags)
            .build()
            .unwrap()
    }

    /// `m2m_P01/`
    pub fn workspace_root(&self) -> PathBuf {
        self.path().join("m2m_P01")
    }

    pub fn ledger(&self) -> String {
        fs::read_to_string(self.workspace_root().join("mri2mesh_log.html")).unwrap()
    }
}

/// A pipeline that runs nothing for real and discards operator output.
pub fn scripted_pipeline(launcher: &Arc<ScriptedLauncher>) -> Pipeline {
    Pipeline::new(Toolchain::new())
        .with_launcher(launcher.clone())
        .with_operator(NullSink)
}
