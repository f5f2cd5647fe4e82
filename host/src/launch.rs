//! Run the application entry point inside the active environment.

use std::ffi::OsString;
use std::path::Path;

use tracing::{error, info};

use crate::error::{LaunchError, Result};
use crate::process::{ProcessRunner, RunStatus};
use crate::venv::Activation;

/// Run `python <entry> [args...]` with inherited stdio and wait for it.
///
/// Any non-successful exit is an error; the caller still owns `active` and
/// deactivates it whatever this returns.
pub fn launch_app<R: ProcessRunner + ?Sized>(
    active: &Activation<'_>,
    runner: &R,
    entry: &Path,
    args: &[OsString],
    workdir: &Path,
) -> Result<RunStatus> {
    if !entry.is_file() {
        return Err(LaunchError::EntryMissing {
            path: entry.to_path_buf(),
        });
    }

    info!(entry = %entry.display(), "starting application");
    let cmd = active
        .python_command()
        .arg(entry)
        .args(args)
        .current_dir(workdir);
    let status = runner.status(&cmd).map_err(|source| LaunchError::Spawn {
        program: cmd.command_line(),
        source,
    })?;

    if !status.success() {
        if runner.interrupted() {
            error!(%status, "application stopped after interrupt");
        }
        return Err(LaunchError::AppFailed {
            entry: entry.to_path_buf(),
            status,
        });
    }
    info!(%status, "application exited");
    Ok(status)
}
