//! Drush site-alias targets.
//!
//! Connection data is a site alias such as `@site.prod`. Commands are run as
//! `drush <alias> [--uri=<uri>] <args...>`.

use super::{ScopedTarget, TargetType};
use crate::{Result, SiteCheckError};
use std::process::Command;

/// Environment variable overriding the drush executable.
pub const DRUSH_BIN_ENV: &str = "SITECHECK_DRUSH_BIN";

pub struct DrushTarget {
    binary: String,
}

impl DrushTarget {
    pub fn new() -> Self {
        DrushTarget {
            binary: std::env::var(DRUSH_BIN_ENV).unwrap_or_else(|_| "drush".to_string()),
        }
    }

    /// Use a specific drush executable.
    pub fn with_binary(binary: impl Into<String>) -> Self {
        DrushTarget {
            binary: binary.into(),
        }
    }

    /// Full argument list passed to the drush executable.
    pub fn arguments(target: &ScopedTarget, args: &[String]) -> Vec<String> {
        let mut full = Vec::with_capacity(args.len() + 2);
        full.push(target.base().connection().to_string());
        if let Some(uri) = target.uri() {
            full.push(format!("--uri={}", uri));
        }
        full.extend(args.iter().cloned());
        full
    }
}

impl Default for DrushTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetType for DrushTarget {
    fn name(&self) -> &str {
        "drush"
    }

    fn description(&self) -> &str {
        "A Drupal site reached through a drush site alias"
    }

    fn validate(&self, connection: &str) -> Result<()> {
        if !connection.starts_with('@') || connection.len() < 2 {
            return Err(SiteCheckError::InvalidTarget(format!(
                "'{}' is not a drush site alias (expected something like @site.prod)",
                connection
            )));
        }
        Ok(())
    }

    fn command(&self, target: &ScopedTarget, args: &[String]) -> Result<Command> {
        let mut command = Command::new(&self.binary);
        command.args(Self::arguments(target, args));
        Ok(command)
    }
}
