//! Filesystem policies for targets with a local root.

use super::{PolicyContext, PolicyDefinition};
use crate::{Outcome, Result, SiteCheckError};

/// Get all filesystem policies
pub fn policies() -> Vec<PolicyDefinition> {
    vec![
        PolicyDefinition::new("fs.file_exists", "Required file present", check_file_exists)
            .with_description("Fail when the file at `path` does not exist"),
        PolicyDefinition::new("fs.file_absent", "Unwanted file removed", check_file_absent)
            .with_description("Fail when the file at `path` exists; remediation deletes it")
            .with_remediation(remove_file),
        PolicyDefinition::new("fs.permissions", "File permissions restricted", check_permissions)
            .with_description("Fail when `path` grants mode bits beyond octal `max_mode`; remediation clears them")
            .with_remediation(restrict_permissions),
    ]
}

/// fs.file_exists
pub fn check_file_exists(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    let path = ctx.param_path("path")?;
    ctx.debug(&format!("looking for {}", path.display()));

    if path.exists() {
        Ok(Outcome::pass(format!("{} exists", path.display())))
    } else {
        Ok(Outcome::fail(
            format!("{} is missing", path.display()),
            "The file is required by this profile",
        ))
    }
}

/// fs.file_absent
pub fn check_file_absent(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    let path = ctx.param_path("path")?;

    if path.exists() {
        Ok(Outcome::fail(
            format!("{} is present", path.display()),
            "The file should not be deployed",
        ))
    } else {
        Ok(Outcome::pass(format!("{} is absent", path.display())))
    }
}

fn remove_file(ctx: &PolicyContext<'_>) -> Result<String> {
    let path = ctx.param_path("path")?;
    std::fs::remove_file(&path)?;
    ctx.info(&format!("removed {}", path.display()));
    Ok(format!("Removed {}", path.display()))
}

/// Parse an octal mode such as "644" or "0o644".
pub fn parse_mode(ctx: &PolicyContext<'_>, key: &str) -> Result<u32> {
    let raw = ctx.param_str(key)?;
    let digits = raw.trim_start_matches("0o");
    u32::from_str_radix(digits, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| SiteCheckError::Parameter {
            policy: ctx.policy.to_string(),
            key: key.to_string(),
            message: format!("'{}' is not an octal file mode", raw),
        })
}

/// fs.permissions
#[cfg(unix)]
pub fn check_permissions(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    use std::os::unix::fs::PermissionsExt;

    let path = ctx.param_path("path")?;
    let max_mode = parse_mode(ctx, "max_mode")?;

    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Outcome::NotApplicable {
                reason: format!("{} does not exist", path.display()),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let mode = metadata.permissions().mode() & 0o7777;
    let excess = mode & !max_mode;
    if excess == 0 {
        Ok(Outcome::pass(format!("{} is {:o}", path.display(), mode)))
    } else {
        Ok(Outcome::fail(
            format!("{} is {:o}, allowed at most {:o}", path.display(), mode, max_mode),
            format!("Extra permission bits: {:o}", excess),
        ))
    }
}

#[cfg(not(unix))]
pub fn check_permissions(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    parse_mode(ctx, "max_mode")?;
    Ok(Outcome::NotApplicable {
        reason: "file modes are only checked on unix".to_string(),
    })
}

#[cfg(unix)]
fn restrict_permissions(ctx: &PolicyContext<'_>) -> Result<String> {
    use std::os::unix::fs::PermissionsExt;

    let path = ctx.param_path("path")?;
    let max_mode = parse_mode(ctx, "max_mode")?;

    let mut permissions = std::fs::metadata(&path)?.permissions();
    let restricted = permissions.mode() & 0o7777 & max_mode;
    permissions.set_mode(restricted);
    std::fs::set_permissions(&path, permissions)?;

    ctx.info(&format!("set {} to {:o}", path.display(), restricted));
    Ok(format!("Set {} to {:o}", path.display(), restricted))
}

#[cfg(not(unix))]
fn restrict_permissions(ctx: &PolicyContext<'_>) -> Result<String> {
    Err(SiteCheckError::Policy {
        policy: ctx.policy.to_string(),
        message: "file modes can only be changed on unix".to_string(),
    })
}
