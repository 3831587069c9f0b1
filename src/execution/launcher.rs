//! Process launching.

use async_trait::async_trait;
use std::fs::File;
use std::io;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::ExecutionError;
use crate::core::command::{CaptureMode, CommandSpec};
use crate::ledger::OutputSink;

/// Starts external commands.
///
/// Implementations run the command to completion and return its exit code.
/// In [`CaptureMode::Capture`] every line the command prints, on stdout or
/// stderr, is passed to `output` in the order it was read.
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Run a command and wait for it to exit.
    async fn launch(
        &self,
        command: &CommandSpec,
        output: &mut dyn OutputSink,
    ) -> Result<i32, ExecutionError>;
}

/// Launcher running real processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessLauncher {
    pub fn new() -> Self {
        Self
    }

    fn prepare(command: &CommandSpec) -> Command {
        let mut cmd = Command::new(command.program());
        cmd.args(command.args());
        for (key, value) in command.environment().iter() {
            cmd.env(key, value);
        }
        if let Some(dir) = command.working_dir() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

#[async_trait]
impl Launcher for ProcessLauncher {
    async fn launch(
        &self,
        command: &CommandSpec,
        output: &mut dyn OutputSink,
    ) -> Result<i32, ExecutionError> {
        let mut cmd = Self::prepare(command);
        let spawn_err = |source| ExecutionError::Spawn {
            program: command.program().to_string(),
            source,
        };

        let status = match command.capture() {
            CaptureMode::StatusOnly => {
                if let Some(path) = command.stdout_file() {
                    // An unwritable redirect target means the command cannot start.
                    let file = File::create(path).map_err(spawn_err)?;
                    cmd.stdout(Stdio::from(file));
                }
                cmd.status().await.map_err(spawn_err)?
            }
            CaptureMode::Capture => {
                cmd.stdin(Stdio::null());
                cmd.stdout(Stdio::piped());
                cmd.stderr(Stdio::piped());
                let mut child = cmd.spawn().map_err(spawn_err)?;

                let (tx, mut rx) = mpsc::unbounded_channel();
                let stdout = forward_lines(child.stdout.take(), tx.clone());
                let stderr = forward_lines(child.stderr.take(), tx);
                let drain = async {
                    while let Some(line) = rx.recv().await {
                        output.write_text(&line)?;
                    }
                    Ok::<(), io::Error>(())
                };
                let (read_out, read_err, written) = tokio::join!(stdout, stderr, drain);

                let status = child.wait().await?;
                read_out?;
                read_err?;
                written?;
                status
            }
        };

        Ok(status.code().unwrap_or(-1))
    }
}

/// Send every line of a pipe to the channel. Invalid UTF-8 is replaced.
async fn forward_lines<R>(pipe: Option<R>, tx: mpsc::UnboundedSender<String>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(());
    };
    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']).to_string();
        if tx.send(line).is_err() {
            // Writer is gone; stop reading so the child sees a closed pipe.
            return Ok(());
        }
    }
}
