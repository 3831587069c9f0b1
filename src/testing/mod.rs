//! Testing utilities for users of the mri2mesh library.
//!
//! This module provides helpers for exercising runs without the external
//! neuroimaging tools installed:
//!
//! - [`ScriptedLauncher`]: records every command instead of running it, with
//!   scripted exit codes
//! - [`RecordingHandler`]: keeps every lifecycle event it receives
//! - [`SharedBuffer`]: an in-memory writer to use as the operator stream

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::RwLock;

use crate::core::command::{CaptureMode, CommandSpec};
use crate::events::{Event, EventHandler};
use crate::execution::{ExecutionError, Launcher};
use crate::ledger::OutputSink;

/// A launcher that records commands instead of running them.
///
/// Every command succeeds unless a failure was scripted for its program or
/// its exact argv line. Capturing commands print one line naming the
/// program; commands with a stdout file get an empty file. Files registered
/// with [`touch_on_run`](Self::touch_on_run) are written by successful
/// mutating commands only.
///
/// # Example
///
/// ```
/// use mri2mesh::testing::ScriptedLauncher;
///
/// let launcher = ScriptedLauncher::new()
///     .fail_program("recon-all", 1)
///     .touch_on_run("meshfix", "/data/m2m_P01/mask_prep/skin.stl");
/// assert!(launcher.argv_lines().is_empty());
/// ```
#[derive(Default)]
pub struct ScriptedLauncher {
    program_codes: HashMap<String, i32>,
    argv_codes: HashMap<String, i32>,
    unstartable: HashSet<String>,
    touches: HashMap<String, Vec<PathBuf>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every invocation of a program exit with `code`.
    pub fn fail_program(mut self, program: impl Into<String>, code: i32) -> Self {
        self.program_codes.insert(program.into(), code);
        self
    }

    /// Make the invocation with exactly this argv line exit with `code`.
    ///
    /// Takes precedence over [`fail_program`](Self::fail_program).
    pub fn fail_argv(mut self, argv_line: impl Into<String>, code: i32) -> Self {
        self.argv_codes.insert(argv_line.into(), code);
        self
    }

    /// Make a program fail to start, as if it were not installed.
    pub fn unstartable(mut self, program: impl Into<String>) -> Self {
        self.unstartable.insert(program.into());
        self
    }

    /// Create (or overwrite) a file whenever a mutating invocation of a
    /// program succeeds. The file holds the invocation's argv line.
    pub fn touch_on_run(mut self, program: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.touches
            .entry(program.into())
            .or_default()
            .push(path.into());
        self
    }

    /// Every launched command, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.lock().clone()
    }

    /// The argv lines of every launched command, in order.
    pub fn argv_lines(&self) -> Vec<String> {
        self.lock().iter().map(CommandSpec::argv_line).collect()
    }

    /// The programs of every launched command, in order.
    pub fn programs(&self) -> Vec<String> {
        self.lock().iter().map(|c| c.program().to_string()).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<CommandSpec>> {
        // A test that panicked while holding the lock already failed.
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn exit_code(&self, command: &CommandSpec) -> i32 {
        self.argv_codes
            .get(&command.argv_line())
            .or_else(|| self.program_codes.get(command.program()))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl Launcher for ScriptedLauncher {
    async fn launch(
        &self,
        command: &CommandSpec,
        output: &mut dyn OutputSink,
    ) -> Result<i32, ExecutionError> {
        self.lock().push(command.clone());

        if self.unstartable.contains(command.program()) {
            return Err(ExecutionError::Spawn {
                program: command.program().to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            });
        }

        if let Some(path) = command.stdout_file() {
            fs::write(path, b"")?;
        }
        if command.capture() == CaptureMode::Capture {
            output.write_text(&format!("[scripted] {}", command.program()))?;
        }

        let code = self.exit_code(command);
        if code == 0 && command.is_mutating() {
            for path in self.touches.get(command.program()).into_iter().flatten() {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, command.argv_line())?;
            }
        }
        Ok(code)
    }
}

/// An event handler that keeps every event.
#[derive(Default)]
pub struct RecordingHandler {
    events: RwLock<Vec<Event>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order.
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl EventHandler for RecordingHandler {
    async fn handle(&self, event: &Event) {
        self.events.write().await.push(event.clone());
    }
}

/// A cloneable in-memory writer.
///
/// All clones share one buffer, so a test can hand one clone to an
/// [`OperatorSink`](crate::ledger::OperatorSink) and read the text back
/// through another.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut bytes = self.bytes.lock().unwrap_or_else(|p| p.into_inner());
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
