//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::sync::Arc;

use lumen_core::{Controller, Light};

use crate::cli::LightTarget;
use crate::error::CliError;

/// Resolve a group/light pair against the current snapshot.
pub fn resolve_light(controller: &Controller, target: &LightTarget) -> Result<Arc<Light>, CliError> {
    controller
        .find_light(&target.group, &target.light)
        .ok_or_else(|| CliError::NotFound {
            resource_type: "light".into(),
            identifier: format!("{}/{}", target.group, target.light),
            list_command: "lights list".into(),
        })
}

/// Whether prompts can be shown (stdin and stderr attached to a terminal).
pub fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !interactive() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    Ok(confirmed)
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
