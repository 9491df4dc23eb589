//! Command dispatch: bridges CLI args -> REST / live alert calls -> output.

pub mod alerts;
pub mod config_cmd;
pub mod geofences;
pub mod util;
pub mod vehicles;
pub mod violations;
pub mod watch;

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    resolved: &Resolved,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(resolved, args, global).await,
        Command::Geofences(args) => {
            geofences::handle(&resolved.rest_client()?, args, global).await
        }
        Command::Vehicles(args) => vehicles::handle(&resolved.rest_client()?, args, global).await,
        Command::Alerts(args) => alerts::handle(&resolved.rest_client()?, args, global).await,
        Command::Violations(args) => {
            violations::handle(&resolved.rest_client()?, args, global).await
        }
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
