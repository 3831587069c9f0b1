//! External command descriptions.
//!
//! A [`CommandSpec`] describes one invocation of an external tool: the
//! argument vector, environment, working directory and the policies that
//! decide how the runner treats it.
//!
//! ```rust
//! use mri2mesh::{CaptureMode, CommandSpec, FailurePolicy};
//!
//! let recon = CommandSpec::builder("recon-all")
//!     .args(["-s", "fs_P01", "-all"])
//!     .env("SUBJECTS_DIR", "/data/study")
//!     .build();
//! assert_eq!(recon.policy(), FailurePolicy::Hard);
//!
//! let viewer = CommandSpec::builder("freeview")
//!     .arg("T1.nii.gz")
//!     .soft()
//!     .read_only()
//!     .capture(CaptureMode::StatusOnly)
//!     .build();
//! assert!(!viewer.is_mutating());
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::environment::Environment;

/// What a non-zero exit status means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// A failure aborts the whole run.
    #[default]
    Hard,
    /// A failure is recorded and the run continues.
    Soft,
}

/// How the command's output is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CaptureMode {
    /// stdout and stderr are captured, teed to the ledger and the operator.
    #[default]
    Capture,
    /// stdio is left to the command; only the exit code is recorded.
    StatusOnly,
}

/// Whether the command writes artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Effect {
    /// The command produces or modifies workspace artifacts.
    #[default]
    Mutating,
    /// The command only inspects artifacts; it runs even when a stage is skipped.
    ReadOnly,
}

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    environment: Environment,
    working_dir: Option<PathBuf>,
    stdout_file: Option<PathBuf>,
    policy: FailurePolicy,
    capture: CaptureMode,
    effect: Effect,
}

impl CommandSpec {
    /// Create a new builder for a command.
    pub fn builder(program: impl Into<String>) -> CommandSpecBuilder {
        CommandSpecBuilder::new(program)
    }

    /// Get the program being executed.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the command arguments.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the extra environment.
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    /// File receiving the command's stdout, if redirected.
    pub fn stdout_file(&self) -> Option<&Path> {
        self.stdout_file.as_deref()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn capture(&self) -> CaptureMode {
        self.capture
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn is_mutating(&self) -> bool {
        self.effect == Effect::Mutating
    }

    /// The invocation as a single shell-like line, as recorded in the ledger.
    pub fn argv_line(&self) -> String {
        let mut line = String::new();
        if let Some(dir) = &self.working_dir {
            line.push_str("cd ");
            line.push_str(&quote(&dir.display().to_string()));
            line.push_str(" && ");
        }
        for (key, value) in self.environment.iter() {
            line.push_str(key);
            line.push('=');
            line.push_str(&quote(value));
            line.push(' ');
        }
        line.push_str(&quote(&self.program));
        for arg in &self.args {
            line.push(' ');
            line.push_str(&quote(arg));
        }
        if let Some(file) = &self.stdout_file {
            line.push_str(" > ");
            line.push_str(&quote(&file.display().to_string()));
        }
        line
    }
}

/// Single-quote a word if it contains anything a shell would split or expand.
fn quote(word: &str) -> String {
    let plain = !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

/// Builder for creating [`CommandSpec`] instances.
#[derive(Debug, Clone)]
pub struct CommandSpecBuilder {
    program: String,
    args: Vec<String>,
    environment: Environment,
    working_dir: Option<PathBuf>,
    stdout_file: Option<PathBuf>,
    policy: FailurePolicy,
    capture: CaptureMode,
    effect: Effect,
}

impl CommandSpecBuilder {
    /// Create a new builder with the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            environment: Environment::default(),
            working_dir: None,
            stdout_file: None,
            policy: FailurePolicy::default(),
            capture: CaptureMode::default(),
            effect: Effect::default(),
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a path argument.
    pub fn path_arg(self, path: impl AsRef<Path>) -> Self {
        let arg = path.as_ref().display().to_string();
        self.arg(arg)
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set environment variables.
    pub fn environment(mut self, env: Environment) -> Self {
        self.environment = env;
        self
    }

    /// Add a single environment variable.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.set(key, value);
        self
    }

    /// Set the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Redirect stdout into a file. Implies [`CaptureMode::StatusOnly`].
    pub fn stdout_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.stdout_file = Some(file.into());
        self.capture = CaptureMode::StatusOnly;
        self
    }

    /// Mark the command as non-critical.
    pub fn soft(mut self) -> Self {
        self.policy = FailurePolicy::Soft;
        self
    }

    /// Mark the command as read-only.
    pub fn read_only(mut self) -> Self {
        self.effect = Effect::ReadOnly;
        self
    }

    /// Set the capture mode.
    pub fn capture(mut self, capture: CaptureMode) -> Self {
        self.capture = capture;
        self
    }

    /// Build the `CommandSpec`.
    pub fn build(self) -> CommandSpec {
        CommandSpec {
            program: self.program,
            args: self.args,
            environment: self.environment,
            working_dir: self.working_dir,
            stdout_file: self.stdout_file,
            policy: self.policy,
            capture: self.capture,
            effect: self.effect,
        }
    }
}
