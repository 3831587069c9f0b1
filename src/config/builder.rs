//! Run request builder.
//!
//! This module turns parsed command-line values into a validated
//! [`RunRequest`]. Validation happens here, before the workspace or the
//! ledger is touched, so usage errors never leave anything behind.

use std::fs::File;
use std::io;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::request::{DEFAULT_VERTEX_COUNT, InputImages, RunRequest, StageFlags};
use crate::core::types::SubjectId;

use super::error::ConfigError;

/// Builder for [`RunRequest`].
///
/// # Example
///
/// ```no_run
/// use mri2mesh::{RunRequestBuilder, StageFlags};
///
/// let request = RunRequestBuilder::new("P01")
///     .images(["T1.nii.gz", "T1fs.nii.gz"])
///     .flags(StageFlags { brain: true, ..StageFlags::default() })
///     .build()?;
/// assert_eq!(request.vertex_count().get(), 60_000);
/// # Ok::<(), mri2mesh::ConfigError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RunRequestBuilder {
    subject: String,
    base_dir: PathBuf,
    images: Vec<PathBuf>,
    flags: StageFlags,
    vertex_count: u32,
}

impl RunRequestBuilder {
    /// Create a builder for a subject, rooted in the current directory.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            base_dir: PathBuf::from("."),
            images: Vec::new(),
            flags: StageFlags::default(),
            vertex_count: DEFAULT_VERTEX_COUNT,
        }
    }

    /// Directory in which the workspace is created.
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Positional image paths, in order T1, T1fs, T2, T2fs.
    pub fn images<I, P>(mut self, images: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.images = images.into_iter().map(Into::into).collect();
        self
    }

    pub fn flags(mut self, flags: StageFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn vertex_count(mut self, count: u32) -> Self {
        self.vertex_count = count;
        self
    }

    /// Validate and build the request.
    ///
    /// Every supplied image must be readable.
    pub fn build(self) -> Result<RunRequest, ConfigError> {
        if self.subject.trim().is_empty() {
            return Err(ConfigError::EmptySubject);
        }

        let count = self.images.len();
        let images = InputImages::from_positional(self.images)
            .ok_or(ConfigError::ImageCount(count))?;

        let vertex_count = NonZeroU32::new(self.vertex_count).ok_or(ConfigError::VertexCount)?;

        for (role, path) in images.iter() {
            check_readable(path).map_err(|source| ConfigError::ImageNotReadable {
                role,
                path: path.to_path_buf(),
                source,
            })?;
            debug!(role = %role, path = %path.display(), "input image readable");
        }

        Ok(RunRequest {
            subject: SubjectId::new(self.subject),
            base_dir: self.base_dir,
            images,
            flags: self.flags,
            vertex_count,
        })
    }
}

/// Open an image for reading; directories are rejected.
fn check_readable(path: &Path) -> io::Result<()> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::request::ImageRole;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, b"nifti").unwrap();
        path
    }

    #[test]
    fn test_build_minimal_request() {
        let request = RunRequestBuilder::new("P01").build().unwrap();

        assert_eq!(request.subject().as_str(), "P01");
        assert_eq!(request.images().count(), 0);
        assert_eq!(request.vertex_count().get(), DEFAULT_VERTEX_COUNT);
        assert!(request.is_noop());
    }

    #[test]
    fn test_build_with_readable_images() {
        let dir = TempDir::new().unwrap();
        let t1 = touch(&dir, "T1.nii.gz");
        let t1fs = touch(&dir, "T1fs.nii.gz");

        let request = RunRequestBuilder::new("P01")
            .base_dir(dir.path())
            .images([t1.clone(), t1fs.clone()])
            .vertex_count(30_000)
            .build()
            .unwrap();

        assert_eq!(request.images().get(ImageRole::T1), Some(t1.as_path()));
        assert_eq!(request.images().get(ImageRole::T1Fs), Some(t1fs.as_path()));
        assert_eq!(request.vertex_count().get(), 30_000);
        assert_eq!(request.base_dir(), dir.path());
    }

    #[test]
    fn test_three_images_is_a_usage_error() {
        let dir = TempDir::new().unwrap();
        let files: Vec<PathBuf> = ["a", "b", "c"].iter().map(|n| touch(&dir, n)).collect();

        let err = RunRequestBuilder::new("P01").images(files).build().unwrap_err();

        assert!(matches!(err, ConfigError::ImageCount(3)));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_unreadable_image_is_reported_with_role() {
        let dir = TempDir::new().unwrap();
        let t1 = touch(&dir, "T1.nii.gz");
        let missing = dir.path().join("missing.nii.gz");

        let err = RunRequestBuilder::new("P01")
            .images([t1, missing.clone()])
            .build()
            .unwrap_err();

        match &err {
            ConfigError::ImageNotReadable { role, path, .. } => {
                assert_eq!(*role, ImageRole::T1Fs);
                assert_eq!(path, &missing);
            }
            other => panic!("Expected ImageNotReadable, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_directory_image_is_not_readable() {
        let dir = TempDir::new().unwrap();
        let t1 = dir.path().join("T1");
        fs::create_dir(&t1).unwrap();
        let t1fs = touch(&dir, "T1fs.nii.gz");

        let err = RunRequestBuilder::new("P01")
            .images([t1.clone(), t1fs])
            .build()
            .unwrap_err();

        match &err {
            ConfigError::ImageNotReadable { role, path, source } => {
                assert_eq!(*role, ImageRole::T1);
                assert_eq!(path, &t1);
                assert_eq!(source.kind(), std::io::ErrorKind::InvalidInput);
            }
            other => panic!("Expected ImageNotReadable, got {:?}", other),
        }
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_zero_vertices_rejected() {
        let err = RunRequestBuilder::new("P01").vertex_count(0).build().unwrap_err();
        assert!(matches!(err, ConfigError::VertexCount));
    }

    #[test]
    fn test_empty_subject_rejected() {
        let err = RunRequestBuilder::new("  ").build().unwrap_err();
        assert!(matches!(err, ConfigError::EmptySubject));
    }
}
