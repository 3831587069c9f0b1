//! Scratch directory cleanup.

use std::fs;
use std::io;

use tracing::{debug, info};

use super::Workspace;

/// What a cleanup pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupOutcome {
    /// Entries removed from the scratch directory.
    Removed(usize),
    /// Nothing to remove.
    AlreadyEmpty,
}

/// Remove everything under the workspace's scratch directory.
///
/// The directory itself is kept. A missing or empty scratch directory is
/// not an error.
pub fn clean_scratch(workspace: &Workspace) -> io::Result<CleanupOutcome> {
    let scratch = workspace.scratch();

    let entries = match fs::read_dir(&scratch) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(dir = %scratch.display(), "scratch directory absent, nothing to clean");
            return Ok(CleanupOutcome::AlreadyEmpty);
        }
        Err(e) => return Err(e),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!(path = %path.display(), "removed");
        removed += 1;
    }

    if removed == 0 {
        info!(dir = %scratch.display(), "scratch directory already empty");
        Ok(CleanupOutcome::AlreadyEmpty)
    } else {
        info!(dir = %scratch.display(), removed, "scratch directory cleaned");
        Ok(CleanupOutcome::Removed(removed))
    }
}
