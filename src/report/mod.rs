//! Report dispatch.
//!
//! Picks a renderer from the number of requested uris and the report format,
//! renders the matching view of the results and writes it to the output
//! destination.
//!
//! | uris   | console        | json        | html        |
//! |--------|----------------|-------------|-------------|
//! | single | console, flat  | json, flat  | html, flat  |
//! | multi  | console, matrix| unsupported | html, matrix|
//!
//! Renderers never touch the result matrix; they return the finished
//! document as a string.

pub mod console;
pub mod html;
pub mod json;

use crate::engine::result::{ResultView, RunReport, RunSummary};
use crate::profile::Profile;
use crate::target::ScopedTarget;
use crate::{Format, Result, SiteCheckError};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

/// Report filename that means standard output.
pub const STDOUT: &str = "stdout";

/// Single or multiple uris, the row key of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UriCount {
    Single,
    Multi,
}

impl UriCount {
    pub fn from_count(count: usize) -> Self {
        if count == 1 {
            UriCount::Single
        } else {
            UriCount::Multi
        }
    }
}

/// Which result view a renderer consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Flat,
    Matrix,
}

/// A cell of the dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    ConsoleFlat,
    ConsoleMatrix,
    JsonFlat,
    HtmlFlat,
    HtmlMatrix,
}

impl RendererKind {
    pub fn view(&self) -> ViewKind {
        match self {
            RendererKind::ConsoleFlat | RendererKind::JsonFlat | RendererKind::HtmlFlat => ViewKind::Flat,
            RendererKind::ConsoleMatrix | RendererKind::HtmlMatrix => ViewKind::Matrix,
        }
    }

    /// Build the renderer for this cell.
    pub fn renderer(&self, color: bool) -> Box<dyn ReportRenderer> {
        match self {
            RendererKind::ConsoleFlat | RendererKind::ConsoleMatrix => {
                Box::new(console::ConsoleRenderer::new(color))
            }
            RendererKind::JsonFlat => Box::new(json::JsonRenderer::new(true)),
            RendererKind::HtmlFlat | RendererKind::HtmlMatrix => Box::new(html::HtmlRenderer::new()),
        }
    }
}

/// The dispatch table.
pub fn select_renderer(uri_count: usize, format: Format) -> Result<RendererKind> {
    match (UriCount::from_count(uri_count), format) {
        (UriCount::Single, Format::Console) => Ok(RendererKind::ConsoleFlat),
        (UriCount::Single, Format::Json) => Ok(RendererKind::JsonFlat),
        (UriCount::Single, Format::Html) => Ok(RendererKind::HtmlFlat),
        (UriCount::Multi, Format::Console) => Ok(RendererKind::ConsoleMatrix),
        (UriCount::Multi, Format::Json) => Err(SiteCheckError::UnsupportedCombination { uri_count, format }),
        (UriCount::Multi, Format::Html) => Ok(RendererKind::HtmlMatrix),
    }
}

/// What every renderer gets besides the results.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub profile: &'a Profile,
    pub target: &'a ScopedTarget,
    pub summary: RunSummary,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl<'a> ReportContext<'a> {
    pub fn from_report(report: &'a RunReport) -> Self {
        ReportContext {
            profile: &report.profile,
            target: &report.target,
            summary: report.summary(),
            started_at: report.started_at,
            completed_at: report.completed_at,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }
}

/// Trait for report renderers
///
/// Renderers only produce the document. Where it goes is decided by the
/// caller: [`ReportDispatcher::dispatch`] hands the rendered text to
/// [`OutputDestination::write`], so a renderer never touches stdout or files.
pub trait ReportRenderer {
    /// Render a view of the results into a complete document
    fn render(&self, ctx: &ReportContext<'_>, view: ResultView<'_>) -> Result<String>;
}

/// Where a report is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDestination {
    Stdout,
    File(PathBuf),
}

impl OutputDestination {
    /// `stdout` selects standard output, anything else names a file.
    pub fn from_report_filename(name: &str) -> Self {
        if name == STDOUT {
            OutputDestination::Stdout
        } else {
            OutputDestination::File(PathBuf::from(name))
        }
    }

    pub fn is_stdout(&self) -> bool {
        matches!(self, OutputDestination::Stdout)
    }

    pub fn write(&self, content: &str) -> Result<()> {
        match self {
            OutputDestination::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(content.as_bytes())?;
                if !content.ends_with('\n') {
                    stdout.write_all(b"\n")?;
                }
                stdout.flush()?;
            }
            OutputDestination::File(path) => {
                std::fs::write(path, content)?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for OutputDestination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputDestination::Stdout => f.write_str(STDOUT),
            OutputDestination::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Selects and invokes renderers.
#[derive(Debug, Clone, Default)]
pub struct ReportDispatcher {
    color: bool,
}

impl ReportDispatcher {
    /// `color` applies to console reports written to stdout.
    pub fn new(color: bool) -> Self {
        ReportDispatcher { color }
    }

    /// Render the report without writing it anywhere.
    pub fn render(&self, report: &RunReport, color: bool) -> Result<String> {
        let kind = select_renderer(report.uri_count, report.format)?;
        let view = match kind.view() {
            ViewKind::Flat => ResultView::Flat(report.matrix.flat().ok_or_else(|| {
                SiteCheckError::Internal(format!(
                    "flat view requested for {} result rows",
                    report.matrix.uri_count()
                ))
            })?),
            ViewKind::Matrix => ResultView::Matrix(&report.matrix),
        };
        debug!(renderer = ?kind, "rendering report");
        kind.renderer(color)
            .render(&ReportContext::from_report(report), view)
    }

    /// Render the report and write it to `destination`. Nothing is written
    /// when no renderer matches.
    pub fn dispatch(&self, report: &RunReport, destination: &OutputDestination) -> Result<()> {
        let content = self.render(report, self.color && destination.is_stdout())?;
        destination.write(&content)?;
        debug!(destination = %destination, bytes = content.len(), "report written");
        Ok(())
    }
}

/// Escape text for inclusion in HTML.
pub(crate) fn escape_html(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#39;"),
            c => result.push(c),
        }
    }
    result
}
