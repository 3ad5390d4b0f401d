//! Step executor - runs individual steps through the command runner

use crate::{
    core::Step,
    execution::runner::{CommandRunner, RunOptions, RunnerError},
};
use tracing::{debug, error, info, warn};

/// Exit indicator reported when the program could not be spawned
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Exit indicator reported when a step exceeded its timeout
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Exit indicator reported when the process was killed by a signal
pub const SIGNAL_EXIT_CODE: i32 = -1;

/// Result of executing a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub step_name: String,
    pub exit_code: i32,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Executes a single step
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Execute a step and return the result
    ///
    /// Never fails: a command that cannot run is reported through an exit
    /// indicator so the engine applies the step's criticality to it.
    pub async fn execute(&self, step: &Step) -> ExecutionResult {
        info!("Executing step: {}", step.name);
        debug!("Command for step {}: {}", step.name, step.command_line());

        let options = RunOptions {
            capture: step.capture_output,
            timeout: step.timeout,
        };

        match self.runner.run(&step.command, options).await {
            Ok(output) => {
                let exit_code = output.exit_code.unwrap_or(SIGNAL_EXIT_CODE);
                if exit_code == 0 {
                    info!("Step {} completed successfully", step.name);
                } else {
                    warn!("Step {} exited with code {}", step.name, exit_code);
                }
                ExecutionResult {
                    step_name: step.name.clone(),
                    exit_code,
                    stdout: output.stdout,
                    stderr: output.stderr,
                }
            }
            Err(e) => {
                error!("Step {} could not run: {}", step.name, e);
                let exit_code = match e {
                    RunnerError::Timeout { .. } => TIMEOUT_EXIT_CODE,
                    RunnerError::EmptyCommand | RunnerError::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
                };
                ExecutionResult {
                    step_name: step.name.clone(),
                    exit_code,
                    stdout: None,
                    stderr: Some(e.to_string()),
                }
            }
        }
    }
}
