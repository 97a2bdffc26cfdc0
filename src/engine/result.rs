//! Result accumulation.
//!
//! The [`ResultMatrix`] maps uri to policy to [`Response`]. Rows keep the
//! order in which uris were first seen; entries within a row keep the order
//! in which policies were first recorded. Recording an existing key
//! overwrites the entry in place.

use crate::profile::Profile;
use crate::report::{OutputDestination, ReportDispatcher};
use crate::target::ScopedTarget;
use crate::{Format, Outcome, RemediationStatus, Response, Result};
use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Ordered policy -> Response mapping for one uri.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyResults {
    entries: Vec<Response>,
}

impl PolicyResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the entry for `response.policy`.
    pub fn insert(&mut self, response: Response) {
        match self.entries.iter_mut().find(|r| r.policy == response.policy) {
            Some(existing) => *existing = response,
            None => self.entries.push(response),
        }
    }

    pub fn get(&self, policy: &str) -> Option<&Response> {
        self.entries.iter().find(|r| r.policy == policy)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Response> {
        self.entries.iter()
    }

    pub fn policies(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|r| r.policy.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for PolicyResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for response in &self.entries {
            map.serialize_entry(&response.policy, response)?;
        }
        map.end()
    }
}

/// uri -> policy -> Response, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMatrix {
    rows: Vec<(String, PolicyResults)>,
}

impl ResultMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a row exists for `uri`, even if nothing is ever recorded.
    pub fn ensure_uri(&mut self, uri: &str) -> &mut PolicyResults {
        let index = match self.rows.iter().position(|(u, _)| u == uri) {
            Some(index) => index,
            None => {
                self.rows.push((uri.to_string(), PolicyResults::new()));
                self.rows.len() - 1
            }
        };
        &mut self.rows[index].1
    }

    /// Record a response at (uri, response.policy), overwriting any earlier one.
    pub fn record(&mut self, uri: &str, response: Response) {
        self.ensure_uri(uri).insert(response);
    }

    pub fn get(&self, uri: &str, policy: &str) -> Option<&Response> {
        self.row(uri).and_then(|row| row.get(policy))
    }

    pub fn row(&self, uri: &str) -> Option<&PolicyResults> {
        self.rows.iter().find(|(u, _)| u == uri).map(|(_, row)| row)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &PolicyResults)> {
        self.rows.iter().map(|(uri, row)| (uri.as_str(), row))
    }

    pub fn uris(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(uri, _)| uri.as_str())
    }

    /// Number of distinct uris.
    pub fn uri_count(&self) -> usize {
        self.rows.len()
    }

    /// The flat policy -> Response view. Only defined for a single uri.
    pub fn flat(&self) -> Option<&PolicyResults> {
        match self.rows.as_slice() {
            [(_, row)] => Some(row),
            _ => None,
        }
    }

    pub fn responses(&self) -> impl Iterator<Item = &Response> {
        self.rows.iter().flat_map(|(_, row)| row.iter())
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_responses(self.responses())
    }
}

impl Serialize for ResultMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rows.len()))?;
        for (uri, row) in &self.rows {
            map.serialize_entry(uri, row)?;
        }
        map.end()
    }
}

/// The shape of results handed to a renderer.
#[derive(Debug, Clone, Copy)]
pub enum ResultView<'a> {
    Flat(&'a PolicyResults),
    Matrix(&'a ResultMatrix),
}

/// Result summary statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub warned: usize,
    pub failed: usize,
    pub errored: usize,
    pub not_applicable: usize,
    pub remediated: usize,
    pub remediation_failed: usize,
    pub unsupported: usize,
}

impl RunSummary {
    pub fn from_responses<'a>(responses: impl IntoIterator<Item = &'a Response>) -> Self {
        let mut summary = RunSummary::default();
        for response in responses {
            summary.total += 1;
            match response.outcome {
                Outcome::Pass { .. } => summary.passed += 1,
                Outcome::Warn { .. } => summary.warned += 1,
                Outcome::Fail { .. } => summary.failed += 1,
                Outcome::Error { .. } => summary.errored += 1,
                Outcome::NotApplicable { .. } => summary.not_applicable += 1,
            }
            match response.remediation {
                Some(RemediationStatus::Remediated { .. }) => summary.remediated += 1,
                Some(RemediationStatus::Failed { .. }) => summary.remediation_failed += 1,
                Some(RemediationStatus::Unsupported) => summary.unsupported += 1,
                None => {}
            }
        }
        summary
    }

    /// True when no check failed or errored.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// A completed run: everything the report dispatcher needs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub profile: Profile,
    /// Last target configuration used in the run
    pub target: ScopedTarget,
    pub matrix: ResultMatrix,
    /// Number of uris requested, duplicates included
    pub uri_count: usize,
    pub format: Format,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl RunReport {
    pub fn summary(&self) -> RunSummary {
        self.matrix.summary()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Same results, to be dispatched in another format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Hand the results to the renderer matching this report's uri count
    /// and format.
    pub fn dispatch(&self, dispatcher: &ReportDispatcher, destination: &OutputDestination) -> Result<()> {
        dispatcher.dispatch(self, destination)
    }
}
