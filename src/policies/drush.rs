//! Drupal policies driven through drush.

use super::{PolicyContext, PolicyDefinition};
use crate::{Outcome, Result, SiteCheckError};

/// Get all drush policies
pub fn policies() -> Vec<PolicyDefinition> {
    vec![PolicyDefinition::new(
        "drush.modules_disabled",
        "Unwanted modules disabled",
        check_modules_disabled,
    )
    .with_description("Fail when any module listed in `modules` is enabled; remediation uninstalls them")
    .with_remediation(uninstall_modules)]
}

/// Machine names of enabled modules, from `drush pm-list --pipe`.
pub fn parse_module_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn enabled_modules(ctx: &PolicyContext<'_>) -> Result<Vec<String>> {
    let args: Vec<String> = ["pm-list", "--status=enabled", "--type=module", "--pipe"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    let output = ctx.exec(&args)?;
    if !output.success() {
        return Err(SiteCheckError::Policy {
            policy: ctx.policy.to_string(),
            message: format!("pm-list failed: {}", output.stderr.trim()),
        });
    }
    Ok(parse_module_list(&output.stdout))
}

fn offending(ctx: &PolicyContext<'_>) -> Result<Vec<String>> {
    let unwanted = ctx.param_list("modules")?;
    let enabled = enabled_modules(ctx)?;
    Ok(unwanted
        .into_iter()
        .filter(|module| enabled.contains(module))
        .collect())
}

/// drush.modules_disabled
pub fn check_modules_disabled(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    let offending = offending(ctx)?;
    if offending.is_empty() {
        Ok(Outcome::pass("No unwanted modules are enabled"))
    } else {
        Ok(Outcome::fail(
            format!("{} unwanted module(s) enabled", offending.len()),
            offending.join(", "),
        ))
    }
}

fn uninstall_modules(ctx: &PolicyContext<'_>) -> Result<String> {
    let offending = offending(ctx)?;
    if offending.is_empty() {
        return Ok("Nothing to uninstall".to_string());
    }

    let mut args = vec!["pm-uninstall".to_string(), "-y".to_string()];
    args.extend(offending.iter().cloned());
    let output = ctx.exec(&args)?;
    if !output.success() {
        return Err(SiteCheckError::Policy {
            policy: ctx.policy.to_string(),
            message: format!("pm-uninstall failed: {}", output.stderr.trim()),
        });
    }
    Ok(format!("Uninstalled {}", offending.join(", ")))
}
