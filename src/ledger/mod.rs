//! The run ledger.
//!
//! The first run creates `m2m_<subject>/mri2mesh_log.html` with the document
//! prologue; every run, the first included, then appends one envelope:
//!
//! ```text
//! <html>
//! <head><title>mri2mesh P01</title></head>
//! <body>
//! <!-- mri2mesh run begin 5d2c... -->
//! <h1>...</h1>
//! <pre>
//! ... escaped command lines and output, stage headings ...
//! </pre>
//! <p>run completed ...; total duration 812.4s</p>
//! <!-- mri2mesh run end 5d2c... -->
//! <!-- mri2mesh run begin 8e41... -->
//! ...
//! ```
//!
//! The body is never closed, so the file stays one document across reruns.
//! The closing part of an envelope is written by [`RunLedger::close`] on
//! both the normal and the abort path. A ledger dropped without being
//! closed writes an `interrupted` closing record, so an envelope is left
//! open only if the process is killed from outside.

mod sink;

pub use sink::{NullSink, OperatorSink, OutputSink, Tee};

use chrono::{DateTime, Local, SecondsFormat};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::types::{RunId, SubjectId};

/// File name of the ledger inside the workspace root.
pub const LEDGER_FILE_NAME: &str = "mri2mesh_log.html";

/// Prefix of the line opening a run envelope.
pub const OPEN_MARKER: &str = "<!-- mri2mesh run begin";

/// Prefix of the line closing a run envelope.
pub const CLOSE_MARKER: &str = "<!-- mri2mesh run end";

/// Errors raised while writing the ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("cannot write ledger '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Final status recorded in a closing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// All planned work finished.
    Completed,
    /// A hard failure ended the run.
    Aborted,
    /// The ledger was dropped without being closed.
    Interrupted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunStatus::Completed => "completed",
            RunStatus::Aborted => "aborted",
            RunStatus::Interrupted => "interrupted",
        })
    }
}

/// Append-only audit log of one run.
pub struct RunLedger {
    path: PathBuf,
    file: File,
    run_id: RunId,
    started: Instant,
    closed: bool,
}

impl RunLedger {
    /// Open the ledger, creating parent directories, and write the opening
    /// header of this run's envelope.
    pub fn open(
        path: impl Into<PathBuf>,
        subject: &SubjectId,
        run_id: &RunId,
    ) -> Result<Self, LedgerError> {
        let path = path.into();
        let io_err = |source| LedgerError::Io {
            path: path.clone(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(io_err)?;
        let fresh = file.metadata().map_err(io_err)?.len() == 0;

        let mut ledger = Self {
            path,
            file,
            run_id: run_id.clone(),
            started: Instant::now(),
            closed: false,
        };

        let subject = escape(subject.as_str());
        if fresh {
            let prologue =
                format!("<html>\n<head><title>mri2mesh {subject}</title></head>\n<body>\n");
            ledger.write_raw(&prologue)?;
        }
        let header = format!(
            "{OPEN_MARKER} {run_id} -->\n\
             <h1>mri2mesh: {subject}</h1>\n\
             <p>run {run_id} started {}</p>\n<pre>\n",
            timestamp(Local::now()),
        );
        ledger.write_raw(&header)?;
        debug!(path = %ledger.path.display(), run = %run_id, "ledger opened");
        Ok(ledger)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Time since the ledger was opened.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Append a block of text. A trailing newline is added when missing.
    pub fn append(&mut self, text: &str) -> Result<(), LedgerError> {
        let mut block = escape(text);
        if !block.ends_with('\n') {
            block.push('\n');
        }
        self.write_raw(&block)
    }

    /// Append a section heading.
    pub fn banner(&mut self, title: &str) -> Result<(), LedgerError> {
        let block = format!("</pre>\n<h2>{}</h2>\n<pre>\n", escape(title));
        self.write_raw(&block)
    }

    /// Write the closing record and the closing marker.
    pub fn close(mut self, status: RunStatus) -> Result<Duration, LedgerError> {
        self.closed = true;
        let duration = self.started.elapsed();
        self.write_footer(status, duration)?;
        debug!(path = %self.path.display(), status = %status, "ledger closed");
        Ok(duration)
    }

    fn write_footer(&mut self, status: RunStatus, duration: Duration) -> Result<(), LedgerError> {
        let footer = format!(
            "</pre>\n<p>run {status} {}; total duration {:.1}s</p>\n\
             {CLOSE_MARKER} {} -->\n",
            timestamp(Local::now()),
            duration.as_secs_f64(),
            self.run_id,
        );
        self.write_raw(&footer)
    }

    fn write_raw(&mut self, text: &str) -> Result<(), LedgerError> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|_| self.file.flush())
            .map_err(|source| LedgerError::Io {
                path: self.path.clone(),
                source,
            })
    }
}

impl OutputSink for RunLedger {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.append(text).map_err(|e| match e {
            LedgerError::Io { source, .. } => source,
        })
    }
}

impl Drop for RunLedger {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let duration = self.started.elapsed();
        if let Err(e) = self.write_footer(RunStatus::Interrupted, duration) {
            warn!(error = %e, "could not close ledger");
        }
    }
}

/// Count the run envelopes in a ledger's contents.
///
/// Returns `None` if the contents are malformed: a closing marker without an
/// open envelope, an opening marker inside an open envelope, or an envelope
/// left open at the end.
pub fn count_runs(contents: &str) -> Option<usize> {
    let mut open = false;
    let mut runs = 0;
    for line in contents.lines() {
        if line.starts_with(OPEN_MARKER) {
            if open {
                return None;
            }
            open = true;
        } else if line.starts_with(CLOSE_MARKER) {
            if !open {
                return None;
            }
            open = false;
            runs += 1;
        }
    }
    if open { None } else { Some(runs) }
}

fn timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Escape text for inclusion in the HTML ledger.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
