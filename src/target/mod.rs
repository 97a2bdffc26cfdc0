//! Target abstraction.
//!
//! A target specification string such as `local:/var/www/html` or
//! `drush:@site.prod` is split into a type name and connection data, and the
//! registered [`TargetType`] for that name validates the data into an
//! immutable [`Target`]. Per-uri overrides never touch the base: they are
//! carried by a [`ScopedTarget`] built fresh for every check.

pub mod drush;
pub mod local;

use crate::{Result, SiteCheckError};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

/// Uri value meaning "no override requested".
pub const DEFAULT_URI: &str = "default";

/// Target type used when a specification carries no `type:` prefix.
pub const DEFAULT_TARGET_TYPE: &str = "drush";

/// Split a target specification into `(type, connection data)`.
///
/// Splits on the first colon. A specification without a colon is treated as
/// connection data for the default (`drush`) target type.
pub fn parse_target(spec: &str) -> Result<(String, String)> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(SiteCheckError::InvalidTarget("empty target".to_string()));
    }

    let (type_name, data) = match spec.split_once(':') {
        Some((type_name, data)) => (type_name, data),
        None => (DEFAULT_TARGET_TYPE, spec),
    };

    if type_name.is_empty() {
        return Err(SiteCheckError::InvalidTarget(format!(
            "missing target type in '{}'",
            spec
        )));
    }

    Ok((type_name.to_string(), data.to_string()))
}

/// Connection behaviour for one kind of target.
pub trait TargetType: Send + Sync {
    /// Registry name (the `type` in `type:data`)
    fn name(&self) -> &str;

    /// One-line description for listings
    fn description(&self) -> &str;

    /// Validate connection data
    fn validate(&self, connection: &str) -> Result<()>;

    /// Build a command that runs `args` against the target.
    fn command(&self, target: &ScopedTarget, args: &[String]) -> Result<Command>;

    /// Local filesystem root, for targets that have one
    fn root(&self, _target: &ScopedTarget) -> Option<PathBuf> {
        None
    }
}

/// Immutable base target: a type plus validated connection data.
#[derive(Clone)]
pub struct Target {
    kind: Arc<dyn TargetType>,
    connection: String,
}

impl Target {
    /// Validate `connection` against `kind` and build the base target.
    pub fn parse(kind: Arc<dyn TargetType>, connection: &str) -> Result<Self> {
        kind.validate(connection)?;
        Ok(Target {
            kind,
            connection: connection.to_string(),
        })
    }

    pub fn kind(&self) -> &Arc<dyn TargetType> {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    pub fn connection(&self) -> &str {
        &self.connection
    }

    /// Scope this target to `uri`. The sentinel [`DEFAULT_URI`] yields no
    /// override.
    pub fn with_uri(&self, uri: &str) -> ScopedTarget {
        ScopedTarget {
            base: self.clone(),
            uri: (uri != DEFAULT_URI).then(|| uri.to_string()),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("type", &self.kind.name())
            .field("connection", &self.connection)
            .finish()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.name(), self.connection)
    }
}

/// A base target with an optional uri override, built per check.
#[derive(Clone, Debug)]
pub struct ScopedTarget {
    base: Target,
    uri: Option<String>,
}

impl ScopedTarget {
    pub fn base(&self) -> &Target {
        &self.base
    }

    /// The uri override, if one is in effect.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The uri override, or the sentinel when none is in effect.
    pub fn uri_or_default(&self) -> &str {
        self.uri.as_deref().unwrap_or(DEFAULT_URI)
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.base.kind.root(self)
    }

    pub fn command(&self, args: &[String]) -> Result<Command> {
        self.base.kind.command(self, args)
    }

    /// Run `args` against the target and capture the result.
    pub fn exec(&self, args: &[String]) -> Result<CommandOutput> {
        let mut command = self.command(args)?;
        let output = command.output().map_err(|e| {
            SiteCheckError::InvalidTarget(format!(
                "failed to run {:?} against {}: {}",
                args, self.base, e
            ))
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl fmt::Display for ScopedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uri {
            Some(uri) => write!(f, "{} ({})", self.base, uri),
            None => write!(f, "{}", self.base),
        }
    }
}

impl Serialize for ScopedTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Target", 3)?;
        state.serialize_field("type", self.base.type_name())?;
        state.serialize_field("connection", self.base.connection())?;
        state.serialize_field("uri", self.uri_or_default())?;
        state.end()
    }
}

/// Captured output of a target command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Target types available out of the box.
pub fn builtin_target_types() -> Vec<Arc<dyn TargetType>> {
    vec![Arc::new(local::LocalTarget), Arc::new(drush::DrushTarget::new())]
}
