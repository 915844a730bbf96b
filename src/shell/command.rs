//! Local process execution.
//!
//! Output is always captured; stdin is closed.

use std::process::{Command, Stdio};

use crate::error::{Result, StagehandError};

/// Outcome of a finished process.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit code (None if killed by signal).
    pub exit_code: Option<i32>,

    /// Standard output.
    pub stdout: String,

    /// Standard error.
    pub stderr: String,

    /// Whether the process exited with status 0.
    pub success: bool,
}

impl CommandResult {
    /// Describe a non-zero exit, or `None` on success.
    pub fn exit_error(&self) -> Option<String> {
        if self.success {
            return None;
        }
        Some(match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        })
    }
}

/// Run a command line through `sh -c`.
///
/// # Errors
///
/// Only when the shell cannot be started.
pub fn execute(command_line: &str) -> Result<CommandResult> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command_line);
    capture(cmd, command_line)
}

/// Run `program` with `args`, without a shell.
pub fn execute_program(program: &str, args: &[&str]) -> Result<CommandResult> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    let shown = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    capture(cmd, &shown)
}

fn capture(mut cmd: Command, shown: &str) -> Result<CommandResult> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    tracing::debug!("spawning `{}`", shown);
    let output = cmd.output().map_err(|e| {
        StagehandError::Other(anyhow::anyhow!("failed to start `{}`: {}", shown, e))
    })?;

    Ok(CommandResult {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}
