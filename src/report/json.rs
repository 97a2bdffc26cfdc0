//! JSON reports (single uri only).

use super::{ReportContext, ReportRenderer};
use crate::engine::result::{PolicyResults, ResultView, RunSummary};
use crate::target::ScopedTarget;
use crate::{Result, SiteCheckError};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Serialize)]
struct ProfileHeader<'a> {
    name: &'a str,
    title: &'a str,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    profile: ProfileHeader<'a>,
    target: &'a ScopedTarget,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    summary: RunSummary,
    results: &'a PolicyResults,
}

/// JSON renderer
pub struct JsonRenderer {
    pretty: bool,
}

impl JsonRenderer {
    pub fn new(pretty: bool) -> Self {
        JsonRenderer { pretty }
    }
}

impl ReportRenderer for JsonRenderer {
    fn render(&self, ctx: &ReportContext<'_>, view: ResultView<'_>) -> Result<String> {
        let ResultView::Flat(results) = view else {
            return Err(SiteCheckError::Internal(
                "the json renderer only handles a single uri".to_string(),
            ));
        };

        let document = JsonReport {
            profile: ProfileHeader {
                name: &ctx.profile.name,
                title: &ctx.profile.title,
            },
            target: ctx.target,
            started_at: ctx.started_at,
            completed_at: ctx.completed_at,
            summary: ctx.summary,
            results,
        };

        let json = if self.pretty {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(json)
    }
}
