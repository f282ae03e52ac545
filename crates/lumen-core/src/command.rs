// ── Command API ──
//
// All write operations flow through a unified `Command` enum. The
// controller's command processor executes them one at a time, in the
// order they were submitted.

use crate::error::CoreError;
use crate::model::LightKey;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: tokio::sync::oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// All possible write operations against the authority.
///
/// Power and brightness changes are never applied locally; the registry
/// changes when the authority pushes the resulting update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPower { key: LightKey, on: bool },
    SetBrightness { key: LightKey, brightness: i32 },
    /// Create a light with authority-assigned defaults, then refresh.
    CreateLight { name: String },
    /// Delete a light, then refresh.
    DeleteLight { key: LightKey },
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    /// Key of the created light, when it could be determined.
    Created(Option<LightKey>),
}
