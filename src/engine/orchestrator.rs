//! Profile run orchestrator.
//!
//! Resolves a profile to its policy bindings, runs every binding against
//! every requested uri in a fresh [`Sandbox`], remediates failures when asked
//! to, and hands the finished [`ResultMatrix`] to the report dispatcher.
//!
//! # Graceful Degradation
//!
//! This module handles errors gracefully:
//! - Unknown profile, format, target type or policy: returned before any check runs
//! - Check errors and panics: recorded as `Outcome::Error`, the loop continues
//! - Remediation failures: recorded on the response, the loop continues
//! - Empty profile: every uri still gets an (empty) row, dispatch proceeds
//! - Report that cannot be produced: returned as `SiteCheckError::Dispatch`
//!   carrying the completed run
//!
//! The loop is strictly sequential. No function in this module will panic.

use crate::engine::progress::{default_reporter, progress_enabled, NullProgress, ProgressReporter};
use crate::engine::result::{ResultMatrix, RunReport};
use crate::engine::sandbox::{DiagnosticSink, Sandbox, TracingSink};
use crate::policies::PolicyDefinition;
use crate::registry::Registry;
use crate::report::{OutputDestination, ReportDispatcher};
use crate::target::{parse_target, Target, DEFAULT_URI};
use crate::{Format, RemediationStatus, Result, SiteCheckError, Verbosity};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Inputs of a single profile run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub profile: String,
    /// Target specification, `type:data`
    pub target: String,
    /// Uris in the order they should run; empty means the default uri
    pub uris: Vec<String>,
    pub remediate: bool,
    /// Requested format name, validated before anything runs
    pub format: String,
    pub destination: OutputDestination,
    pub verbosity: Verbosity,
}

impl RunRequest {
    pub fn new(profile: impl Into<String>, target: impl Into<String>) -> Self {
        RunRequest {
            profile: profile.into(),
            target: target.into(),
            uris: Vec::new(),
            remediate: false,
            format: Format::Console.as_str().to_string(),
            destination: OutputDestination::Stdout,
            verbosity: Verbosity::Normal,
        }
    }

    pub fn with_uris<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.uris = uris.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_remediate(mut self, remediate: bool) -> Self {
        self.remediate = remediate;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_destination(mut self, destination: OutputDestination) -> Self {
        self.destination = destination;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Profile run orchestrator
pub struct Orchestrator<'r> {
    registry: &'r Registry,
    progress: Option<Arc<dyn ProgressReporter>>,
    logger: Arc<dyn DiagnosticSink>,
    dispatcher: ReportDispatcher,
}

impl<'r> Orchestrator<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Orchestrator {
            registry,
            progress: None,
            logger: Arc::new(TracingSink),
            dispatcher: ReportDispatcher::default(),
        }
    }

    /// Reporter used when progress is enabled for a run. Defaults to a
    /// terminal bar on stderr when stderr is a terminal.
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Diagnostic sink handed to every sandbox.
    pub fn with_logger(mut self, logger: Arc<dyn DiagnosticSink>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: ReportDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn dispatcher(&self) -> &ReportDispatcher {
        &self.dispatcher
    }

    /// Run the profile and dispatch the report.
    ///
    /// A dispatch failure comes back as [`SiteCheckError::Dispatch`] with
    /// the completed run attached.
    pub fn run(&self, request: &RunRequest) -> Result<RunReport> {
        let report = self.execute(request)?;
        match report.dispatch(&self.dispatcher, &request.destination) {
            Ok(()) => Ok(report),
            Err(source) => {
                warn!(error = %source, "report dispatch failed; results are kept");
                Err(SiteCheckError::Dispatch {
                    source: Box::new(source),
                    report: Box::new(report),
                })
            }
        }
    }

    /// Run every binding against every uri without dispatching.
    pub fn execute(&self, request: &RunRequest) -> Result<RunReport> {
        let profile = self
            .registry
            .profile(&request.profile)
            .ok_or_else(|| SiteCheckError::ProfileNotFound(request.profile.clone()))?;
        let format: Format = request.format.parse()?;

        let uris: Vec<String> = if request.uris.is_empty() {
            vec![DEFAULT_URI.to_string()]
        } else {
            request.uris.clone()
        };

        let progress: Arc<dyn ProgressReporter> =
            if progress_enabled(format, &request.destination, request.verbosity) {
                self.progress.clone().unwrap_or_else(default_reporter)
            } else {
                Arc::new(NullProgress)
            };

        let (type_name, connection) = parse_target(&request.target)?;
        let kind = self
            .registry
            .target_type(&type_name)
            .ok_or_else(|| SiteCheckError::UnknownTargetType(type_name.clone()))?;
        let base = Target::parse(kind.clone(), &connection)?;

        let policies: Vec<Arc<PolicyDefinition>> = profile
            .bindings()
            .iter()
            .map(|binding| {
                self.registry
                    .policy(&binding.policy)
                    .ok_or_else(|| SiteCheckError::PolicyNotFound(binding.policy.clone()))
            })
            .collect::<Result<_>>()?;

        info!(
            profile = %profile.name,
            target = %base,
            uris = uris.len(),
            policies = policies.len(),
            remediate = request.remediate,
            format = %format,
            "starting profile run"
        );

        let started_at = Utc::now();
        let mut matrix = ResultMatrix::new();
        let mut snapshot = None;

        progress.started(uris.len() * policies.len());
        for uri in &uris {
            matrix.ensure_uri(uri);

            for (binding, policy) in profile.bindings().iter().zip(&policies) {
                progress.policy_started(uri, &policy.title);

                let mut sandbox = Sandbox::new(kind.clone(), policy.clone());
                sandbox
                    .set_parameters(binding.parameters.clone())
                    .set_logger(self.logger.clone());
                sandbox.target_mut().attach(base.clone()).set_uri(uri);

                let mut response = sandbox.run();
                debug!(uri = %uri, policy = %policy.name, status = response.outcome.label(), "policy executed");

                if !response.is_successful() && request.remediate {
                    progress.remediating(uri, &policy.title);
                    response = match sandbox.remediate() {
                        Ok(remediated) => remediated,
                        Err(e) => response.with_remediation(RemediationStatus::Failed {
                            message: e.to_string(),
                        }),
                    };
                    debug!(uri = %uri, policy = %policy.name, remediation = ?response.remediation, "remediation attempted");
                }

                if let Ok(target) = sandbox.target().scoped() {
                    snapshot = Some(target);
                }
                matrix.record(uri, response);
                progress.policy_completed(uri, &policy.title);
            }
        }
        progress.finished();

        let last_uri = uris.last().map(String::as_str).unwrap_or(DEFAULT_URI);
        let target = snapshot.unwrap_or_else(|| base.with_uri(last_uri));
        let report = RunReport {
            profile: profile.clone(),
            target,
            matrix,
            uri_count: uris.len(),
            format,
            started_at,
            completed_at: Utc::now(),
        };

        let summary = report.summary();
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            remediated = summary.remediated,
            "profile run complete"
        );
        Ok(report)
    }
}
