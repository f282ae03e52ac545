//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod lights;
pub mod util;
pub mod watch;

use lumen_core::{Controller, ControllerConfig, CoreError};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch an authority-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    config: ControllerConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        // Single invocations skip the update stream and periodic resync.
        Command::Lights(args) => {
            Controller::oneshot(config, |ctrl| async move {
                Ok::<_, CoreError>(lights::handle(&ctrl, args, global).await)
            })
            .await?
        }
        Command::Watch(args) => watch::handle(config, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
