//! Pipeline execution

pub mod engine;
pub mod executor;
pub mod runner;

pub use engine::{DeployEngine, EventHandler, ExecutionEvent, RunReport, StepRecord};
pub use executor::{ExecutionResult, StepExecutor};
pub use runner::{CommandOutput, CommandRunner, RunOptions, RunnerError, SystemCommandRunner};
