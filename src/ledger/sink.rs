//! Output sinks.
//!
//! Command output goes to more than one place at once: the run ledger and
//! the operator's terminal. Each destination is an [`OutputSink`]; a
//! [`Tee`] fans text out to several of them and keeps a copy.

use std::io::{self, Write};

/// A destination accepting text.
///
/// Text is passed line by line; a trailing newline is added by the sink
/// when missing.
pub trait OutputSink: Send {
    /// Write one line (or block) of text.
    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Sink writing to the operator's stream, stdout by default.
pub struct OperatorSink {
    out: Box<dyn Write + Send>,
}

impl OperatorSink {
    /// Wrap any writer.
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    /// Sink writing to the process's stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl OutputSink for OperatorSink {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n")?;
        }
        self.out.flush()
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn write_text(&mut self, _text: &str) -> io::Result<()> {
        Ok(())
    }
}

/// Fans text out to several sinks and keeps the combined text.
///
/// Every sink sees every line in the same order. The first sink error
/// stops the write and is returned.
pub struct Tee<'a> {
    sinks: Vec<&'a mut dyn OutputSink>,
    captured: String,
}

impl<'a> Tee<'a> {
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            captured: String::new(),
        }
    }

    /// Builder: add a sink.
    pub fn with(mut self, sink: &'a mut dyn OutputSink) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Text written so far.
    pub fn captured(&self) -> &str {
        &self.captured
    }

    pub fn into_captured(self) -> String {
        self.captured
    }
}

impl Default for Tee<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for Tee<'_> {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        self.captured.push_str(text);
        if !text.ends_with('\n') {
            self.captured.push('\n');
        }
        for sink in self.sinks.iter_mut() {
            sink.write_text(text)?;
        }
        Ok(())
    }
}
