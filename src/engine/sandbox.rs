//! Execution context for a single policy.
//!
//! A [`Sandbox`] runs one policy against one target configuration and
//! returns exactly one [`Response`]. The orchestrator builds a fresh sandbox
//! for every (uri, policy) pair, so nothing configured here outlives the pair.
//!
//! # Graceful Degradation
//!
//! - Check logic returning `Err`: recorded as `Outcome::Error`
//! - Check logic panicking: caught via std::panic::catch_unwind, recorded as `Outcome::Error`
//! - No target attached: recorded as `Outcome::Error`
//! - Diagnostic sink failures: swallowed by [`crate::policies::PolicyContext::log`]
//!
//! `run` never fails. `remediate` fails only when called before `run`.

use crate::policies::{PolicyContext, PolicyDefinition};
use crate::profile::Parameters;
use crate::target::{ScopedTarget, Target, TargetType, DEFAULT_URI};
use crate::{Outcome, RemediationStatus, Response, Result, SiteCheckError};
use std::any::Any;
use std::io::{self, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, error, info, trace, warn, Level};

/// One diagnostic line emitted by policy logic.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostic<'a> {
    pub level: Level,
    pub policy: &'a str,
    pub uri: &'a str,
    pub message: &'a str,
}

/// Destination for policy diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, record: &Diagnostic<'_>) -> io::Result<()>;
}

/// Forwards diagnostics to `tracing`, with the policy and uri as fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn log(&self, record: &Diagnostic<'_>) -> io::Result<()> {
        let (policy, uri, message) = (record.policy, record.uri, record.message);
        if record.level == Level::ERROR {
            error!(policy, uri, "{}", message);
        } else if record.level == Level::WARN {
            warn!(policy, uri, "{}", message);
        } else if record.level == Level::INFO {
            info!(policy, uri, "{}", message);
        } else if record.level == Level::DEBUG {
            debug!(policy, uri, "{}", message);
        } else {
            trace!(policy, uri, "{}", message);
        }
        Ok(())
    }
}

/// Writes one line per diagnostic to any writer.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        WriterSink {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> DiagnosticSink for WriterSink<W> {
    fn log(&self, record: &Diagnostic<'_>) -> io::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| io::Error::other("diagnostic writer lock poisoned"))?;
        writeln!(
            writer,
            "[{}] {} [{}] {}",
            record.level, record.policy, record.uri, record.message
        )
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn log(&self, _record: &Diagnostic<'_>) -> io::Result<()> {
        Ok(())
    }
}

/// The sandbox's own, mutable view of the target: a base plus the uri
/// override for this execution.
pub struct TargetInstance {
    kind: Arc<dyn TargetType>,
    base: Option<Target>,
    uri: Option<String>,
}

impl TargetInstance {
    fn new(kind: Arc<dyn TargetType>) -> Self {
        TargetInstance {
            kind,
            base: None,
            uri: None,
        }
    }

    /// Validate connection data with this instance's target type.
    pub fn parse(&mut self, connection: &str) -> Result<&mut Self> {
        self.base = Some(Target::parse(self.kind.clone(), connection)?);
        Ok(self)
    }

    /// Use an already parsed base target.
    pub fn attach(&mut self, base: Target) -> &mut Self {
        self.base = Some(base);
        self
    }

    /// Scope the next execution to `uri`; the sentinel clears the override.
    pub fn set_uri(&mut self, uri: &str) -> &mut Self {
        self.uri = (uri != DEFAULT_URI).then(|| uri.to_string());
        self
    }

    pub fn kind(&self) -> &Arc<dyn TargetType> {
        &self.kind
    }

    /// Snapshot of the configured target.
    pub fn scoped(&self) -> Result<ScopedTarget> {
        let base = self
            .base
            .as_ref()
            .ok_or_else(|| SiteCheckError::InvalidTarget("no target attached".to_string()))?;
        Ok(base.with_uri(self.uri.as_deref().unwrap_or(DEFAULT_URI)))
    }
}

/// Runs one policy against one target configuration.
pub struct Sandbox {
    policy: Arc<PolicyDefinition>,
    parameters: Parameters,
    logger: Arc<dyn DiagnosticSink>,
    target: TargetInstance,
    last: Option<Response>,
}

impl Sandbox {
    pub fn new(kind: Arc<dyn TargetType>, policy: Arc<PolicyDefinition>) -> Self {
        Sandbox {
            policy,
            parameters: Parameters::new(),
            logger: Arc::new(TracingSink),
            target: TargetInstance::new(kind),
            last: None,
        }
    }

    pub fn set_parameters(&mut self, parameters: Parameters) -> &mut Self {
        self.parameters = parameters;
        self
    }

    pub fn set_logger(&mut self, logger: Arc<dyn DiagnosticSink>) -> &mut Self {
        self.logger = logger;
        self
    }

    pub fn target(&self) -> &TargetInstance {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut TargetInstance {
        &mut self.target
    }

    pub fn policy(&self) -> &PolicyDefinition {
        &self.policy
    }

    /// The most recent response, if `run` has been called.
    pub fn last_response(&self) -> Option<&Response> {
        self.last.as_ref()
    }

    /// Execute the check logic and return its response.
    pub fn run(&mut self) -> Response {
        let start = Instant::now();
        let outcome = match self.target.scoped() {
            Ok(target) => {
                let ctx = PolicyContext::new(
                    &self.policy.name,
                    &self.parameters,
                    &target,
                    self.logger.as_ref(),
                );
                let check = &self.policy.check_fn;
                match catch_unwind(AssertUnwindSafe(|| check(&ctx))) {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => Outcome::Error {
                        message: e.to_string(),
                    },
                    Err(payload) => Outcome::Error {
                        message: format!("Check panicked: {}", panic_message(payload.as_ref())),
                    },
                }
            }
            Err(e) => Outcome::Error {
                message: e.to_string(),
            },
        };

        let response = Response {
            policy: self.policy.name.clone(),
            title: self.policy.title.clone(),
            outcome,
            remediable: self.policy.can_remediate(),
            remediation: None,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        self.last = Some(response.clone());
        response
    }

    /// Attempt remediation after a `run`.
    ///
    /// Without remediation logic the previous response comes back tagged
    /// [`RemediationStatus::Unsupported`]. Otherwise the remediation runs and
    /// the check is executed again; the returned response is that re-check,
    /// tagged with how remediation went. Remediation failures are part of the
    /// response, never an `Err`.
    pub fn remediate(&mut self) -> Result<Response> {
        let previous = self.last.clone().ok_or(SiteCheckError::RemediateBeforeRun)?;

        let Some(remediate) = self.policy.remediate_fn.as_ref() else {
            let response = previous.with_remediation(RemediationStatus::Unsupported);
            self.last = Some(response.clone());
            return Ok(response);
        };

        let attempt = match self.target.scoped() {
            Ok(target) => {
                let ctx = PolicyContext::new(
                    &self.policy.name,
                    &self.parameters,
                    &target,
                    self.logger.as_ref(),
                );
                match catch_unwind(AssertUnwindSafe(|| remediate(&ctx))) {
                    Ok(result) => result.map_err(|e| e.to_string()),
                    Err(payload) => Err(format!(
                        "Remediation panicked: {}",
                        panic_message(payload.as_ref())
                    )),
                }
            }
            Err(e) => Err(e.to_string()),
        };

        let response = match attempt {
            Ok(action) => {
                let verified = self.run();
                if verified.is_successful() {
                    verified.with_remediation(RemediationStatus::Remediated { action })
                } else {
                    verified.with_remediation(RemediationStatus::Failed {
                        message: format!("{}, but the check still fails", action),
                    })
                }
            }
            Err(message) => previous.with_remediation(RemediationStatus::Failed { message }),
        };
        self.last = Some(response.clone());
        Ok(response)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
