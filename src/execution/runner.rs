//! External command runner - spawns argument-list commands without a shell

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Errors raised when a command could not run to completion
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("empty command")]
    EmptyCommand,

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {} seconds", .after.as_secs())]
    Timeout { program: String, after: Duration },
}

/// How to run a command
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Capture stdout/stderr instead of inheriting the terminal
    pub capture: bool,

    /// Kill the command if it runs longer than this
    pub timeout: Option<Duration>,
}

impl RunOptions {
    pub fn captured() -> Self {
        Self {
            capture: true,
            timeout: None,
        }
    }
}

/// What a finished command left behind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,

    pub stdout: Option<String>,

    pub stderr: Option<String>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Trait for running external commands - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command[0]` with `command[1..]` as arguments and wait for it
    async fn run(&self, command: &[String], options: RunOptions) -> Result<CommandOutput, RunnerError>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Clone, Default)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &[String], options: RunOptions) -> Result<CommandOutput, RunnerError> {
        let (program, args) = command.split_first().ok_or(RunnerError::EmptyCommand)?;
        debug!("Spawning {} with {} argument(s)", program, args.len());

        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        if options.capture {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        } else {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }

        let spawn_error = |source: std::io::Error| RunnerError::Spawn {
            program: program.clone(),
            source,
        };

        let wait = async {
            if options.capture {
                let output = cmd.output().await.map_err(spawn_error)?;
                Ok::<_, RunnerError>(CommandOutput {
                    exit_code: output.status.code(),
                    stdout: Some(String::from_utf8_lossy(&output.stdout).into_owned()),
                    stderr: Some(String::from_utf8_lossy(&output.stderr).into_owned()),
                })
            } else {
                let status = cmd.status().await.map_err(spawn_error)?;
                Ok::<_, RunnerError>(CommandOutput {
                    exit_code: status.code(),
                    stdout: None,
                    stderr: None,
                })
            }
        };

        let output = match options.timeout {
            Some(limit) => timeout(limit, wait).await.map_err(|_| RunnerError::Timeout {
                program: program.clone(),
                after: limit,
            })??,
            None => wait.await?,
        };

        if !output.success() {
            match output.exit_code {
                Some(code) => debug!("{} exited with code {}", program, code),
                None => warn!("{} was terminated by a signal", program),
            }
        }

        Ok(output)
    }
}

/// Run a command with captured output and return its trimmed stdout
///
/// Used for read-only queries such as the current branch name.
pub async fn query<R: CommandRunner + ?Sized>(
    runner: &R,
    command: &[String],
) -> Result<Option<String>, RunnerError> {
    let output = runner.run(command, RunOptions::captured()).await?;
    if !output.success() {
        return Ok(None);
    }

    let value = output.stdout.unwrap_or_default().trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}
