//! Command policies.

use super::{PolicyContext, PolicyDefinition};
use crate::{Outcome, Result};

/// Get all command policies
pub fn policies() -> Vec<PolicyDefinition> {
    vec![PolicyDefinition::new(
        "command.succeeds",
        "Command exits cleanly",
        check_command_succeeds,
    )
    .with_description("Run `command` with optional `args` against the target; fail on a non-zero exit")]
}

/// command.succeeds
pub fn check_command_succeeds(ctx: &PolicyContext<'_>) -> Result<Outcome> {
    let mut args = vec![ctx.param_str("command")?.to_string()];
    args.extend(ctx.param_list("args")?);

    let output = ctx.exec(&args)?;
    let line = args.join(" ");

    if output.success() {
        Ok(Outcome::pass(format!("`{}` succeeded", line)))
    } else {
        let code = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Ok(Outcome::fail(
            format!("`{}` exited with {}", line, code),
            output.stderr.trim().to_string(),
        ))
    }
}
