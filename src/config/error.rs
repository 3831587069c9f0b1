//! Configuration error types.
//!
//! These errors are raised while turning the command line into a
//! [`RunRequest`](crate::RunRequest), before anything is written to disk.

use std::path::PathBuf;
use thiserror::Error;

use crate::core::request::ImageRole;

/// Errors that can occur when resolving a run request.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The subject identifier is empty.
    #[error("subject id must not be empty")]
    EmptySubject,

    /// Wrong number of positional image arguments.
    #[error("expected 0, 1, 2 or 4 image paths after the subject id, got {0}")]
    ImageCount(usize),

    /// The vertex count is not a positive integer.
    #[error("number of vertices must be a positive integer")]
    VertexCount,

    /// An input image cannot be opened for reading.
    #[error("cannot read {role} image '{path}': {source}")]
    ImageNotReadable {
        role: ImageRole,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Process exit status for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            ConfigError::ImageNotReadable { .. } => 1,
            _ => 2,
        }
    }
}
