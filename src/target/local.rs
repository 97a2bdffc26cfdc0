//! Local directory targets.
//!
//! Connection data is a directory on this machine. Commands run with that
//! directory as their working directory; the current uri override, if any,
//! is exported as `SITECHECK_URI`.

use super::{ScopedTarget, TargetType};
use crate::{Result, SiteCheckError};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Environment variable carrying the uri override into target commands.
pub const URI_ENV: &str = "SITECHECK_URI";

pub struct LocalTarget;

impl TargetType for LocalTarget {
    fn name(&self) -> &str {
        "local"
    }

    fn description(&self) -> &str {
        "A directory on this machine"
    }

    fn validate(&self, connection: &str) -> Result<()> {
        if connection.is_empty() {
            return Err(SiteCheckError::InvalidTarget(
                "local target requires a directory path".to_string(),
            ));
        }
        if !Path::new(connection).is_dir() {
            return Err(SiteCheckError::InvalidTarget(format!(
                "{} is not a directory",
                connection
            )));
        }
        Ok(())
    }

    fn command(&self, target: &ScopedTarget, args: &[String]) -> Result<Command> {
        let (program, rest) = args.split_first().ok_or_else(|| {
            SiteCheckError::InvalidTarget("no command given for local target".to_string())
        })?;

        let mut command = Command::new(program);
        command.args(rest).current_dir(target.base().connection());
        if let Some(uri) = target.uri() {
            command.env(URI_ENV, uri);
        }
        Ok(command)
    }

    fn root(&self, target: &ScopedTarget) -> Option<PathBuf> {
        Some(PathBuf::from(target.base().connection()))
    }
}
