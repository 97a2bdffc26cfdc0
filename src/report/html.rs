//! HTML reports for one or many uris.

use super::{escape_html, ReportContext, ReportRenderer};
use crate::engine::result::{PolicyResults, ResultMatrix, ResultView};
use crate::{Outcome, RemediationStatus, Response, Result};

const STYLE: &str = "body{font-family:sans-serif;margin:2em;color:#222}\
table{border-collapse:collapse;margin-bottom:2em}\
th,td{border:1px solid #ccc;padding:.3em .6em;text-align:left;vertical-align:top}\
.pass{color:#1a7f37}.warn{color:#9a6700}.fail,.error{color:#cf222e}.na{color:#6e7781}\
.details{color:#57606a;font-size:.9em}";

/// HTML renderer
#[derive(Debug, Default)]
pub struct HtmlRenderer;

impl HtmlRenderer {
    pub fn new() -> Self {
        HtmlRenderer
    }

    fn status_class(outcome: &Outcome) -> &'static str {
        match outcome {
            Outcome::Pass { .. } => "pass",
            Outcome::Warn { .. } => "warn",
            Outcome::Fail { .. } => "fail",
            Outcome::Error { .. } => "error",
            Outcome::NotApplicable { .. } => "na",
        }
    }

    fn status_cell(outcome: &Outcome) -> String {
        format!(
            "<td class=\"{}\">{}</td>",
            Self::status_class(outcome),
            escape_html(&outcome.label().to_uppercase())
        )
    }

    fn remediation_text(response: &Response) -> String {
        match &response.remediation {
            None => String::new(),
            Some(RemediationStatus::Unsupported) => "not supported".to_string(),
            Some(RemediationStatus::Remediated { action }) => escape_html(action),
            Some(RemediationStatus::Failed { message }) => format!("failed: {}", escape_html(message)),
        }
    }

    fn results_table(output: &mut String, results: &PolicyResults) {
        if results.is_empty() {
            output.push_str("<p>No policies in this profile.</p>\n");
            return;
        }

        output.push_str("<table>\n<tr><th>Status</th><th>Policy</th><th>Result</th><th>Remediation</th></tr>\n");
        for response in results.iter() {
            output.push_str("<tr>");
            output.push_str(&Self::status_cell(&response.outcome));
            output.push_str(&format!(
                "<td>{}<br><code>{}</code></td>",
                escape_html(&response.title),
                escape_html(&response.policy)
            ));
            output.push_str(&format!("<td>{}", escape_html(response.outcome.message())));
            if let Some(details) = response.outcome.details().filter(|d| !d.is_empty()) {
                output.push_str(&format!("<div class=\"details\">{}</div>", escape_html(details)));
            }
            output.push_str("</td>");
            output.push_str(&format!("<td>{}</td>", Self::remediation_text(response)));
            output.push_str("</tr>\n");
        }
        output.push_str("</table>\n");
    }

    fn overview_table(output: &mut String, matrix: &ResultMatrix) {
        let mut policies: Vec<&Response> = Vec::new();
        for response in matrix.responses() {
            if !policies.iter().any(|p| p.policy == response.policy) {
                policies.push(response);
            }
        }

        output.push_str("<h2>Overview</h2>\n<table>\n<tr><th>Policy</th>");
        for uri in matrix.uris() {
            output.push_str(&format!("<th>{}</th>", escape_html(uri)));
        }
        output.push_str("</tr>\n");

        for policy in &policies {
            output.push_str(&format!("<tr><td>{}</td>", escape_html(&policy.title)));
            for uri in matrix.uris() {
                match matrix.get(uri, &policy.policy) {
                    Some(response) => output.push_str(&Self::status_cell(&response.outcome)),
                    None => output.push_str("<td class=\"na\">-</td>"),
                }
            }
            output.push_str("</tr>\n");
        }
        output.push_str("</table>\n");
    }
}

impl ReportRenderer for HtmlRenderer {
    fn render(&self, ctx: &ReportContext<'_>, view: ResultView<'_>) -> Result<String> {
        let title = escape_html(&ctx.profile.title);
        let mut output = String::new();

        output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
        output.push_str(&format!("<title>{}</title>\n<style>{}</style>\n</head>\n<body>\n", title, STYLE));
        output.push_str(&format!("<h1>{}</h1>\n", title));
        if !ctx.profile.description.is_empty() {
            output.push_str(&format!("<p>{}</p>\n", escape_html(&ctx.profile.description)));
        }
        output.push_str(&format!(
            "<p>Target: <code>{}</code><br>Date: {}</p>\n",
            escape_html(&ctx.target.to_string()),
            escape_html(&ctx.completed_at.to_rfc3339())
        ));

        let s = ctx.summary;
        output.push_str(&format!(
            "<p>{} passed, {} warnings, {} failed, {} errors, {} not applicable, {} remediated</p>\n",
            s.passed, s.warned, s.failed, s.errored, s.not_applicable, s.remediated
        ));

        match view {
            ResultView::Flat(results) => Self::results_table(&mut output, results),
            ResultView::Matrix(matrix) => {
                Self::overview_table(&mut output, matrix);
                for (uri, row) in matrix.rows() {
                    output.push_str(&format!("<h2>{}</h2>\n", escape_html(uri)));
                    Self::results_table(&mut output, row);
                }
            }
        }

        output.push_str("</body>\n</html>\n");
        Ok(output)
    }
}
