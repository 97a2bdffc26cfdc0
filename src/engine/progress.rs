//! Liveness feedback while a profile runs.
//!
//! The orchestrator decides once, before the loop, whether progress is shown
//! at all (see [`progress_enabled`]) and then only talks to a
//! [`ProgressReporter`].

use crate::report::OutputDestination;
use crate::{Format, Verbosity};
use std::io::{self, IsTerminal, Write};
use std::sync::{Arc, Mutex};

/// Observer of the uri × policy loop.
pub trait ProgressReporter: Send + Sync {
    /// Called once before the loop with the number of pairs to run.
    fn started(&self, _total: usize) {}

    /// A policy is about to run against `uri`.
    fn policy_started(&self, _uri: &str, _title: &str) {}

    /// A failed policy is being remediated.
    fn remediating(&self, _uri: &str, _title: &str) {}

    /// A (uri, policy) pair has been recorded.
    fn policy_completed(&self, uri: &str, title: &str);

    /// Called once after the loop.
    fn finished(&self) {}
}

/// Reporter used when progress is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressReporter for NullProgress {
    fn policy_completed(&self, _uri: &str, _title: &str) {}
}

struct BarState<W> {
    writer: W,
    done: usize,
    total: usize,
}

/// Single-line progress bar, redrawn in place.
pub struct TerminalProgress<W: Write + Send> {
    state: Mutex<BarState<W>>,
    width: usize,
}

impl TerminalProgress<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TerminalProgress<W> {
    pub fn new(writer: W) -> Self {
        TerminalProgress {
            state: Mutex::new(BarState {
                writer,
                done: 0,
                total: 0,
            }),
            width: 28,
        }
    }

    pub fn into_inner(self) -> W {
        match self.state.into_inner() {
            Ok(state) => state.writer,
            Err(poisoned) => poisoned.into_inner().writer,
        }
    }

    fn draw(&self, message: &str) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let filled = if state.total == 0 {
            self.width
        } else {
            (self.width * state.done / state.total).min(self.width)
        };
        let bar = format!("{}{}", "=".repeat(filled), " ".repeat(self.width - filled));
        let line = format!(
            "\r\x1b[2K {:>3}/{:<3} [{}] {}",
            state.done, state.total, bar, message
        );
        // Progress output is best effort.
        let _ = state.writer.write_all(line.as_bytes());
        let _ = state.writer.flush();
    }
}

impl<W: Write + Send> ProgressReporter for TerminalProgress<W> {
    fn started(&self, total: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.total = total;
            state.done = 0;
        }
        self.draw("");
    }

    fn policy_started(&self, uri: &str, title: &str) {
        self.draw(&format!("[{}] {}", uri, title));
    }

    fn remediating(&self, _uri: &str, title: &str) {
        self.draw(&format!("\u{26a0}   Remediating {}", title));
    }

    fn policy_completed(&self, uri: &str, title: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.done += 1;
        }
        self.draw(&format!("[{}] {}", uri, title));
    }

    fn finished(&self) {
        if let Ok(mut state) = self.state.lock() {
            let _ = state.writer.write_all(b"\n");
            let _ = state.writer.flush();
        }
    }
}

/// Whether progress should be shown for a run.
///
/// Progress is suppressed when a machine-readable report goes to stdout, so
/// the document is not interleaved with the bar, under `--quiet`, and above
/// very verbose output, where log lines take its place.
pub fn progress_enabled(format: Format, destination: &OutputDestination, verbosity: Verbosity) -> bool {
    let machine_on_stdout = format.is_machine_readable() && destination.is_stdout();
    !(machine_on_stdout || verbosity == Verbosity::Quiet || verbosity > Verbosity::VeryVerbose)
}

/// Reporter used when none was injected: the redrawn bar when stderr is a
/// terminal, nothing otherwise.
pub fn default_reporter() -> Arc<dyn ProgressReporter> {
    if io::stderr().is_terminal() {
        Arc::new(TerminalProgress::stderr())
    } else {
        Arc::new(NullProgress)
    }
}
