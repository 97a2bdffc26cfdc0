//! Human-readable console reports.

use super::{ReportContext, ReportRenderer};
use crate::engine::result::{PolicyResults, ResultMatrix, ResultView};
use crate::{Outcome, RemediationStatus, Response, Result};

const RULE: &str = "--------------------------------------------------------------------------------\n";

/// Console renderer for both the flat and the matrix view.
pub struct ConsoleRenderer {
    color: bool,
}

impl ConsoleRenderer {
    pub fn new(color: bool) -> Self {
        ConsoleRenderer { color }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.colorize(text, "32")
    }

    fn yellow(&self, text: &str) -> String {
        self.colorize(text, "33")
    }

    fn red(&self, text: &str) -> String {
        self.colorize(text, "31")
    }

    fn gray(&self, text: &str) -> String {
        self.colorize(text, "90")
    }

    fn status(&self, outcome: &Outcome) -> String {
        match outcome {
            Outcome::Pass { .. } => self.green("[PASS]"),
            Outcome::Warn { .. } => self.yellow("[WARN]"),
            Outcome::Fail { .. } => self.red("[FAIL]"),
            Outcome::Error { .. } => self.red("[ERR ]"),
            Outcome::NotApplicable { .. } => self.gray("[N/A ]"),
        }
    }

    fn header(&self, output: &mut String, ctx: &ReportContext<'_>) {
        output.push_str(RULE);
        output.push_str(&format!("{}\n", ctx.profile.title));
        if !ctx.profile.description.is_empty() {
            output.push_str(&format!("{}\n", ctx.profile.description));
        }
        output.push_str(&format!("Target: {}\n", ctx.target));
        output.push_str(&format!("Date: {}\n", ctx.completed_at.to_rfc3339()));
        output.push_str(RULE);
        output.push('\n');
    }

    fn responses(&self, output: &mut String, results: &PolicyResults) {
        if results.is_empty() {
            output.push_str(&format!("  {}\n", self.gray("No policies in this profile")));
            return;
        }

        for response in results.iter() {
            output.push_str(&format!(
                "  {} {}: {}\n",
                self.status(&response.outcome),
                response.title,
                response.outcome.message()
            ));
            if let Some(details) = response.outcome.details().filter(|d| !d.is_empty()) {
                output.push_str(&format!("         {}\n", self.gray(details)));
            }
            if let Some(note) = self.remediation_note(response) {
                output.push_str(&format!("         {}\n", note));
            }
        }
    }

    fn remediation_note(&self, response: &Response) -> Option<String> {
        match response.remediation.as_ref()? {
            RemediationStatus::Unsupported => Some(self.gray("Remediation not supported")),
            RemediationStatus::Remediated { action } => Some(self.green(&format!("Remediated: {}", action))),
            RemediationStatus::Failed { message } => {
                Some(self.red(&format!("Remediation failed: {}", message)))
            }
        }
    }

    fn overview(&self, output: &mut String, matrix: &ResultMatrix) {
        let mut policies: Vec<(&str, &str)> = Vec::new();
        for (_, row) in matrix.rows() {
            for response in row.iter() {
                if !policies.iter().any(|(name, _)| *name == response.policy) {
                    policies.push((response.policy.as_str(), response.title.as_str()));
                }
            }
        }
        if policies.is_empty() {
            return;
        }

        let title_width = policies.iter().map(|(_, t)| t.chars().count()).max().unwrap_or(0);
        let uris: Vec<&str> = matrix.uris().collect();

        output.push_str("OVERVIEW\n");
        output.push_str(&format!("  {:width$}", "", width = title_width));
        for uri in &uris {
            output.push_str(&format!("  {:<8}", uri));
        }
        output.push('\n');

        for (policy, title) in &policies {
            output.push_str(&format!("  {:width$}", title, width = title_width));
            for uri in &uris {
                let cell = match matrix.get(uri, policy) {
                    Some(response) => self.status(&response.outcome),
                    None => self.gray("[----]"),
                };
                let pad = " ".repeat(uri.chars().count().max(8).saturating_sub(6));
                output.push_str(&format!("  {}{}", cell, pad));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    fn footer(&self, output: &mut String, ctx: &ReportContext<'_>) {
        let s = ctx.summary;
        output.push_str(RULE);
        output.push_str(&format!(
            "SUMMARY: {} passed, {} warnings, {} failed, {} errors, {} not applicable\n",
            s.passed, s.warned, s.failed, s.errored, s.not_applicable
        ));
        if s.remediated + s.remediation_failed + s.unsupported > 0 {
            output.push_str(&format!(
                "REMEDIATION: {} remediated, {} failed, {} unsupported\n",
                s.remediated, s.remediation_failed, s.unsupported
            ));
        }
        output.push_str(&format!("Total time: {:.1}s\n", ctx.duration_ms() as f64 / 1000.0));
        output.push_str(RULE.trim_end());
    }
}

impl ReportRenderer for ConsoleRenderer {
    fn render(&self, ctx: &ReportContext<'_>, view: ResultView<'_>) -> Result<String> {
        let mut output = String::new();
        self.header(&mut output, ctx);

        match view {
            ResultView::Flat(results) => {
                self.responses(&mut output, results);
                output.push('\n');
            }
            ResultView::Matrix(matrix) => {
                for (uri, row) in matrix.rows() {
                    output.push_str(&format!("URI: {}\n", uri));
                    self.responses(&mut output, row);
                    output.push('\n');
                }
                self.overview(&mut output, matrix);
            }
        }

        self.footer(&mut output, ctx);
        Ok(output)
    }
}
