//! Policy definitions and the built-in policy library.
//!
//! A policy is a title plus check logic, and optionally remediation logic.
//! Both are plain closures over a [`PolicyContext`], which hands them the
//! binding's parameters, the scoped target and a diagnostic sink.
//!
//! # Failure handling
//!
//! Check logic reports problems with the target as `Outcome::Fail`. Returning
//! `Err` means the check itself could not run; the sandbox records that as
//! `Outcome::Error` and the run carries on.
//!
//! - Filesystem: `fs.file_exists`, `fs.file_absent`, `fs.permissions`
//! - Commands: `command.succeeds`
//! - Drush: `drush.modules_disabled`

pub mod command;
pub mod drush;
pub mod filesystem;

use crate::engine::sandbox::{Diagnostic, DiagnosticSink};
use crate::profile::Parameters;
use crate::target::{CommandOutput, ScopedTarget};
use crate::{Outcome, Result, SiteCheckError};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, Level};

/// Check logic: inspects the target and returns an outcome.
pub type CheckFn = Box<dyn Fn(&PolicyContext<'_>) -> Result<Outcome> + Send + Sync>;

/// Remediation logic: changes the target and describes what it did.
pub type RemediateFn = Box<dyn Fn(&PolicyContext<'_>) -> Result<String> + Send + Sync>;

/// A registered policy.
pub struct PolicyDefinition {
    /// Unique identifier (e.g., "fs.permissions")
    pub name: String,
    /// Human-readable title, shown in progress messages and reports
    pub title: String,
    pub description: String,
    pub check_fn: CheckFn,
    pub remediate_fn: Option<RemediateFn>,
}

impl PolicyDefinition {
    pub fn new<F>(name: impl Into<String>, title: impl Into<String>, check: F) -> Self
    where
        F: Fn(&PolicyContext<'_>) -> Result<Outcome> + Send + Sync + 'static,
    {
        PolicyDefinition {
            name: name.into(),
            title: title.into(),
            description: String::new(),
            check_fn: Box::new(check),
            remediate_fn: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_remediation<F>(mut self, remediate: F) -> Self
    where
        F: Fn(&PolicyContext<'_>) -> Result<String> + Send + Sync + 'static,
    {
        self.remediate_fn = Some(Box::new(remediate));
        self
    }

    /// Whether the policy declares remediation capability.
    pub fn can_remediate(&self) -> bool {
        self.remediate_fn.is_some()
    }
}

impl std::fmt::Debug for PolicyDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyDefinition")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("remediable", &self.can_remediate())
            .finish()
    }
}

/// Everything a policy closure may look at.
pub struct PolicyContext<'a> {
    pub policy: &'a str,
    pub parameters: &'a Parameters,
    pub target: &'a ScopedTarget,
    logger: &'a dyn DiagnosticSink,
}

impl<'a> PolicyContext<'a> {
    pub fn new(
        policy: &'a str,
        parameters: &'a Parameters,
        target: &'a ScopedTarget,
        logger: &'a dyn DiagnosticSink,
    ) -> Self {
        PolicyContext {
            policy,
            parameters,
            target,
            logger,
        }
    }

    fn parameter_error(&self, key: &str, message: &str) -> SiteCheckError {
        SiteCheckError::Parameter {
            policy: self.policy.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }

    /// Required string parameter.
    pub fn param_str(&self, key: &str) -> Result<&str> {
        match self.parameters.get(key) {
            Some(serde_json::Value::String(value)) => Ok(value),
            Some(_) => Err(self.parameter_error(key, "must be a string")),
            None => Err(self.parameter_error(key, "is required")),
        }
    }

    /// Optional list of strings; a single string is accepted as a one-item list.
    pub fn param_list(&self, key: &str) -> Result<Vec<String>> {
        match self.parameters.get(key) {
            None => Ok(Vec::new()),
            Some(serde_json::Value::String(value)) => Ok(vec![value.clone()]),
            Some(serde_json::Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.parameter_error(key, "must contain only strings"))
                })
                .collect(),
            Some(_) => Err(self.parameter_error(key, "must be a string or a list of strings")),
        }
    }

    /// Path parameter resolved against the target root. `{uri}` expands to
    /// the current uri. The expanded path must stay below the root: absolute
    /// paths and `..` segments are rejected.
    pub fn param_path(&self, key: &str) -> Result<PathBuf> {
        let raw = self.param_str(key)?;
        let relative = raw.replace("{uri}", self.target.uri_or_default());
        if Path::new(&relative)
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(self.parameter_error(
                key,
                &format!("'{}' must be a relative path inside the target root", relative),
            ));
        }
        let root = self.target.root().ok_or_else(|| SiteCheckError::Policy {
            policy: self.policy.to_string(),
            message: format!(
                "target type '{}' has no local filesystem",
                self.target.base().type_name()
            ),
        })?;
        Ok(root.join(relative))
    }

    /// Run a command against the target.
    pub fn exec(&self, args: &[String]) -> Result<CommandOutput> {
        self.debug(&format!("exec {:?}", args));
        self.target.exec(args)
    }

    /// Write to the diagnostic sink. Sink failures never reach the policy.
    pub fn log(&self, level: Level, message: &str) {
        let record = Diagnostic {
            level,
            policy: self.policy,
            uri: self.target.uri_or_default(),
            message,
        };
        if let Err(e) = self.logger.log(&record) {
            debug!(policy = self.policy, error = %e, "diagnostic sink write failed");
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(Level::DEBUG, message);
    }

    pub fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(Level::WARN, message);
    }
}

/// All built-in policies
pub fn builtin_policies() -> Vec<PolicyDefinition> {
    let mut policies = Vec::new();
    policies.extend(filesystem::policies());
    policies.extend(command::policies());
    policies.extend(drush::policies());
    policies
}
