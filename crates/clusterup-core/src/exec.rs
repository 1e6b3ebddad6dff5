//! External command execution.
//!
//! Every child process is built through [`command`], which strips the
//! ambient `OS_CLOUD` variable. Cloud selection is always passed explicitly
//! on the command line, so one profile's tenant never leaks into another
//! profile's child processes.

use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{Error, Result};

/// Environment variable never inherited by child processes
pub const SCRUBBED_ENV: &str = "OS_CLOUD";

/// Build a command with the scrubbed environment
pub fn command(program: impl AsRef<std::ffi::OsStr>) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_remove(SCRUBBED_ENV).kill_on_drop(true);
    cmd
}

/// Render a command line for logs and error messages
pub fn display(cmd: &Command) -> String {
    let std = cmd.as_std();
    std::iter::once(std.get_program())
        .chain(std.get_args())
        .map(|part| part.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run to completion with captured output
///
/// Returns stdout on success. On a non-zero exit the error carries the
/// combined stdout and stderr.
pub async fn run_captured(cmd: &mut Command, step: &str) -> Result<String> {
    let line = display(cmd);
    debug!(step, command = %line, "Running command");

    let output = cmd
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::command_failed(step, None, format!("{}: {}", line, e)))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}{}", stdout, stderr).trim().to_string();
        return Err(Error::command_failed(step, output.status.code(), combined));
    }

    Ok(stdout)
}

/// Run to completion with output streamed to the terminal
pub async fn run_streaming(cmd: &mut Command, step: &str) -> Result<()> {
    let line = display(cmd);
    info!(step, command = %line, "Running command");

    let status = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .await
        .map_err(|e| Error::command_failed(step, None, format!("{}: {}", line, e)))?;

    if !status.success() {
        return Err(Error::command_failed(step, status.code(), line));
    }

    Ok(())
}
