//! Destinations for batch scan results.
//!
//! The batch orchestrator hands every [`PatternResult`] to a [`ResultSink`]
//! as soon as its unit finishes, so results arrive in completion order, not
//! manifest order. [`PatternResult::index`] lets sinks restore manifest order
//! when they need it.

use crate::types::{PatternResult, ResolveOutcome, ScanSummary};
use parking_lot::Mutex;
use std::io::Write;

/// Receiver of per-pattern batch results.
pub trait ResultSink: Send + Sync {
    /// Called once per pattern, from the worker that produced it
    fn accept(&self, result: PatternResult);

    /// Called once after every unit has finished
    fn finish(&self, _summary: &ScanSummary) {}
}

/// Prints results to any writer (stdout in the CLI).
///
/// Writes are serialized so output from concurrent units never interleaves
/// within one pattern.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
    show_lines: bool,
}

impl<W: Write + Send> WriterSink<W> {
    /// Create a sink that prints matched file paths
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
            show_lines: false,
        }
    }

    /// Also print every extracted line
    pub fn show_lines(mut self, show: bool) -> Self {
        self.show_lines = show;
        self
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_result(&self, out: &mut W, result: &PatternResult) -> std::io::Result<()> {
        writeln!(out, "{}", result.pattern)?;
        if result.outcome != ResolveOutcome::Matched {
            writeln!(out, "  ({})", result.outcome)?;
            return Ok(());
        }
        for file in &result.result.files {
            let marker = if file.complete { "" } else { " (incomplete)" };
            writeln!(out, "  {} [{} lines]{}", file.path.display(), file.len(), marker)?;
            if self.show_lines {
                for line in &file.lines {
                    writeln!(out, "    {}", line)?;
                }
            }
        }
        Ok(())
    }
}

impl<W: Write + Send> ResultSink for WriterSink<W> {
    fn accept(&self, result: PatternResult) {
        let mut out = self.writer.lock();
        if let Err(e) = self.write_result(&mut out, &result) {
            tracing::warn!(pattern = %result.pattern, error = %e, "Failed to write result");
        }
    }

    fn finish(&self, _summary: &ScanSummary) {
        if let Err(e) = self.writer.lock().flush() {
            tracing::warn!(error = %e, "Failed to flush results");
        }
    }
}

/// Keeps every result in memory.
#[derive(Default)]
pub struct CollectingSink {
    results: Mutex<Vec<PatternResult>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of results received so far
    pub fn len(&self) -> usize {
        self.results.lock().len()
    }

    /// True if nothing was received
    pub fn is_empty(&self) -> bool {
        self.results.lock().is_empty()
    }

    /// Take the results, sorted back into manifest order
    pub fn into_ordered(self) -> Vec<PatternResult> {
        let mut results = self.results.into_inner();
        results.sort_by_key(|r| r.index);
        results
    }
}

impl ResultSink for CollectingSink {
    fn accept(&self, result: PatternResult) {
        self.results.lock().push(result);
    }
}

/// Forwards results over a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: crossbeam_channel::Sender<PatternResult>,
}

impl ChannelSink {
    /// Create a new channel-based sink
    pub fn new() -> (Self, crossbeam_channel::Receiver<PatternResult>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (ChannelSink { sender }, receiver)
    }
}

impl ResultSink for ChannelSink {
    fn accept(&self, result: PatternResult) {
        let _ = self.sender.send(result);
    }
}
