//! sitecheck library
//!
//! Runs audit profiles against a target and renders the results.
//!
//! A profile is an ordered list of policy bindings. Each binding is executed
//! once per requested uri inside its own [`engine::sandbox::Sandbox`], failed
//! checks may be remediated, and the collected [`engine::result::ResultMatrix`]
//! is handed to the report dispatcher, which picks a console, json or html
//! renderer based on the output format and the number of uris.
//!
//! # Example
//!
//! ```no_run
//! use sitecheck::registry::Registry;
//! use sitecheck::{run_profile, RunConfig};
//!
//! let registry = Registry::builtin().expect("built-in registry");
//! let config = RunConfig {
//!     profile: "basic".to_string(),
//!     target: "local:/var/www/html".to_string(),
//!     ..Default::default()
//! };
//! let report = run_profile(&registry, config).expect("profile run failed");
//! println!("Failed checks: {}", report.summary().failed);
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod logging;
pub mod policies;
pub mod profile;
pub mod registry;
pub mod report;
pub mod target;
pub mod version;

use cli::args::ProfileRunArgs;
use engine::orchestrator::{Orchestrator, RunRequest};
use engine::result::RunReport;
use report::OutputDestination;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// Re-exports for public API
pub use engine::orchestrator::Orchestrator as ProfileRunner;
pub use engine::result::{ResultMatrix, RunSummary};

/// Outcome of a single policy check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Check passed
    Pass { message: String },
    /// Check passed with something worth a look
    Warn { message: String, details: String },
    /// Check failed
    Fail { message: String, details: String },
    /// The check logic itself could not complete
    Error { message: String },
    /// Check does not apply to this target
    NotApplicable { reason: String },
}

impl Outcome {
    pub fn pass(message: impl Into<String>) -> Self {
        Outcome::Pass {
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>, details: impl Into<String>) -> Self {
        Outcome::Fail {
            message: message.into(),
            details: details.into(),
        }
    }

    /// Whether this outcome counts as a successful check.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Pass { .. } | Outcome::Warn { .. } | Outcome::NotApplicable { .. }
        )
    }

    /// Short status label used by renderers.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Pass { .. } => "pass",
            Outcome::Warn { .. } => "warn",
            Outcome::Fail { .. } => "fail",
            Outcome::Error { .. } => "error",
            Outcome::NotApplicable { .. } => "n/a",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Pass { message }
            | Outcome::Warn { message, .. }
            | Outcome::Fail { message, .. }
            | Outcome::Error { message } => message,
            Outcome::NotApplicable { reason } => reason,
        }
    }

    pub fn details(&self) -> Option<&str> {
        match self {
            Outcome::Warn { details, .. } | Outcome::Fail { details, .. } => Some(details),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass { message } => write!(f, "PASS: {}", message),
            Outcome::Warn { message, details } => write!(f, "WARN: {} ({})", message, details),
            Outcome::Fail { message, details } => write!(f, "FAIL: {} ({})", message, details),
            Outcome::Error { message } => write!(f, "ERROR: {}", message),
            Outcome::NotApplicable { reason } => write!(f, "N/A: {}", reason),
        }
    }
}

/// What happened when remediation was requested for a failed check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RemediationStatus {
    /// The policy has no remediation logic; the response is otherwise unchanged
    Unsupported,
    /// Remediation ran and the re-check passed
    Remediated { action: String },
    /// Remediation ran (or tried to) and the check still does not pass
    Failed { message: String },
}

/// Recorded result of running one policy against one uri.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    /// Policy identifier
    pub policy: String,
    /// Policy title, for display
    pub title: String,
    /// Check outcome
    pub outcome: Outcome,
    /// Whether the policy declares remediation capability
    pub remediable: bool,
    /// Set once remediation has been requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<RemediationStatus>,
    pub duration_ms: u64,
}

impl Response {
    pub fn is_successful(&self) -> bool {
        self.outcome.is_success()
    }

    /// Same response, tagged with a remediation status.
    pub fn with_remediation(mut self, status: RemediationStatus) -> Self {
        self.remediation = Some(status);
        self
    }
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Console,
    Json,
    Html,
}

impl Format {
    pub const ALL: [Format; 3] = [Format::Console, Format::Json, Format::Html];

    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Console => "console",
            Format::Json => "json",
            Format::Html => "html",
        }
    }

    /// Formats meant to be consumed by other programs rather than read live.
    pub fn is_machine_readable(&self) -> bool {
        matches!(self, Format::Json | Format::Html)
    }
}

impl FromStr for Format {
    type Err = SiteCheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "console" => Ok(Format::Console),
            "json" => Ok(Format::Json),
            "html" => Ok(Format::Html),
            other => Err(SiteCheckError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output verbosity, ordered from least to most chatty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    #[default]
    Normal,
    Verbose,
    VeryVerbose,
    Debug,
}

impl Verbosity {
    /// Map `--quiet` and the number of `-v` flags to a verbosity.
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        if quiet {
            return Verbosity::Quiet;
        }
        match verbose {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            2 => Verbosity::VeryVerbose,
            _ => Verbosity::Debug,
        }
    }
}

/// Error types for sitecheck operations.
#[derive(Error, Debug)]
pub enum SiteCheckError {
    #[error("{0} is not a valid profile")]
    ProfileNotFound(String),

    #[error("Reporting format '{0}' is not supported")]
    UnsupportedFormat(String),

    #[error("Unknown policy: {0}")]
    PolicyNotFound(String),

    #[error("Unknown target type: {0}")]
    UnknownTargetType(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("The {format} format does not support reports across {uri_count} uris")]
    UnsupportedCombination { uri_count: usize, format: Format },

    #[error("Remediation requested before the policy was run")]
    RemediateBeforeRun,

    #[error("Policy {policy}: parameter '{key}' {message}")]
    Parameter {
        policy: String,
        key: String,
        message: String,
    },

    #[error("Policy {policy} failed: {message}")]
    Policy { policy: String, message: String },

    #[error("Profile error in {context}: {message}")]
    ProfileParse { context: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    /// Checks ran but the report could not be produced. The completed run
    /// is kept so it can be dispatched again in another format.
    #[error("{source}")]
    Dispatch {
        #[source]
        source: Box<SiteCheckError>,
        report: Box<RunReport>,
    },
}

impl SiteCheckError {
    /// Errors raised while validating input, before any check executes.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SiteCheckError::ProfileNotFound(_)
                | SiteCheckError::UnsupportedFormat(_)
                | SiteCheckError::PolicyNotFound(_)
                | SiteCheckError::UnknownTargetType(_)
                | SiteCheckError::InvalidTarget(_)
                | SiteCheckError::ProfileParse { .. }
                | SiteCheckError::Config(_)
        )
    }

    /// The completed run carried by a dispatch failure, if any.
    pub fn into_report(self) -> Option<RunReport> {
        match self {
            SiteCheckError::Dispatch { report, .. } => Some(*report),
            _ => None,
        }
    }
}

/// Result type alias for sitecheck operations
pub type Result<T> = std::result::Result<T, SiteCheckError>;

/// Configuration for a profile run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Profile name
    pub profile: String,
    /// Target specification, `type:data`
    pub target: String,
    /// Uris to audit; empty means the default uri only
    pub uris: Vec<String>,
    /// Attempt remediation of failed checks
    pub remediate: bool,
    /// Requested report format, validated by the orchestrator
    pub format: String,
    /// `stdout` or a file path
    pub report_filename: String,
    pub verbosity: Verbosity,
    /// Colour console output written to stdout
    pub color: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            profile: String::new(),
            target: String::new(),
            uris: Vec::new(),
            remediate: false,
            format: Format::Console.as_str().to_string(),
            report_filename: "stdout".to_string(),
            verbosity: Verbosity::Normal,
            color: true,
        }
    }
}

impl RunConfig {
    /// Create configuration from command line arguments
    pub fn from_args(args: &ProfileRunArgs, default_format: &str, verbosity: Verbosity, color: bool) -> Self {
        RunConfig {
            profile: args.profile.clone(),
            target: args.target.clone(),
            uris: args.uris.clone(),
            remediate: args.remediate,
            format: args
                .format
                .clone()
                .unwrap_or_else(|| default_format.to_string()),
            report_filename: args.report_filename.clone(),
            verbosity,
            color,
        }
    }

    pub fn to_request(&self) -> RunRequest {
        RunRequest {
            profile: self.profile.clone(),
            target: self.target.clone(),
            uris: self.uris.clone(),
            remediate: self.remediate,
            format: self.format.clone(),
            destination: OutputDestination::from_report_filename(&self.report_filename),
            verbosity: self.verbosity,
        }
    }
}

/// Run a profile and write its report.
///
/// This is the main entry point for running a profile: it executes every
/// policy binding against every uri and dispatches the results to the
/// renderer matching the format and uri count.
///
/// # Errors
///
/// Configuration problems (unknown profile, unsupported format, bad target)
/// are returned before any check runs. A report that cannot be produced after
/// the checks ran is returned as [`SiteCheckError::Dispatch`], which still
/// carries the results.
pub fn run_profile(registry: &registry::Registry, config: RunConfig) -> Result<RunReport> {
    let orchestrator = Orchestrator::new(registry)
        .with_dispatcher(report::ReportDispatcher::new(config.color));
    orchestrator.run(&config.to_request())
}
