//! Subprocess execution for the `git` and `gh` gateways.
//!
//! Everything that shells out goes through [`CommandRunner`] so the gateways
//! can be exercised in tests against canned output.

use std::process::Command;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, UpsertError};

/// Captured result of a finished subprocess.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, or `-1` if the process was killed by a signal.
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// Runs external programs to completion.
pub trait CommandRunner {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

impl<T: CommandRunner + ?Sized> CommandRunner for &T {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        (**self).execute(program, args)
    }
}

/// [`CommandRunner`] backed by `std::process::Command`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn execute(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(command = %command_line(program, args), "running");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| UpsertError::Spawn {
                program: program.to_string(),
                source,
            })?;

        let result = CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };
        debug!(status = result.status, "finished");
        Ok(result)
    }
}

/// Human-readable rendering of an argv, for logs and error messages.
pub fn command_line(program: &str, args: &[String]) -> String {
    let mut line = program.to_string();
    for arg in args {
        line.push(' ');
        if arg.is_empty() || arg.contains(char::is_whitespace) {
            line.push_str(&format!("{:?}", arg));
        } else {
            line.push_str(arg);
        }
    }
    line
}

/// Build an owned argv from string slices.
pub fn args<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}

/// Run a command and turn a non-zero exit into [`UpsertError::Command`].
pub fn run_checked(runner: &impl CommandRunner, program: &str, args: &[String]) -> Result<CommandOutput> {
    let output = runner.execute(program, args)?;
    if !output.success() {
        return Err(command_failed(program, args, output));
    }
    Ok(output)
}

/// Run a command and return its trimmed stdout.
pub fn run_stdout(runner: &impl CommandRunner, program: &str, args: &[String]) -> Result<String> {
    Ok(run_checked(runner, program, args)?.stdout.trim().to_string())
}

/// Run a command and decode its stdout as JSON.
pub fn run_json<T: DeserializeOwned>(
    runner: &impl CommandRunner,
    program: &str,
    args: &[String],
) -> Result<T> {
    let output = run_checked(runner, program, args)?;
    serde_json::from_str(output.stdout.trim()).map_err(|source| UpsertError::Json {
        command: command_line(program, args),
        source,
    })
}

pub fn command_failed(program: &str, args: &[String], output: CommandOutput) -> UpsertError {
    UpsertError::Command {
        command: command_line(program, args),
        status: output.status,
        stdout: output.stdout,
        stderr: output.stderr,
    }
}
