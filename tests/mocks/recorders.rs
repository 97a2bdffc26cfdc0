//! Observers that record what they were told.

use sitecheck::engine::progress::ProgressReporter;
use sitecheck::engine::sandbox::{Diagnostic, DiagnosticSink};
use std::io;
use std::sync::Mutex;

/// Records every progress callback as a short string.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<String>>,
}

impl RecordingProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressReporter for RecordingProgress {
    fn started(&self, total: usize) {
        self.push(format!("started {}", total));
    }

    fn policy_started(&self, uri: &str, title: &str) {
        self.push(format!("run {} {}", uri, title));
    }

    fn remediating(&self, uri: &str, title: &str) {
        self.push(format!("remediate {} {}", uri, title));
    }

    fn policy_completed(&self, uri: &str, title: &str) {
        self.push(format!("done {} {}", uri, title));
    }

    fn finished(&self) {
        self.push("finished".to_string());
    }
}

/// Keeps diagnostics as `LEVEL policy uri message` lines.
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

impl DiagnosticSink for RecordingSink {
    fn log(&self, record: &Diagnostic<'_>) -> io::Result<()> {
        self.lines.lock().unwrap().push(format!(
            "{} {} {} {}",
            record.level, record.policy, record.uri, record.message
        ));
        Ok(())
    }
}

/// A sink that always fails to write.
pub struct BrokenSink;

impl DiagnosticSink for BrokenSink {
    fn log(&self, _record: &Diagnostic<'_>) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }
}
