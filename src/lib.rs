//! redeploy - a fail-fast deployment pipeline runner

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::core::{
    Criticality, DeployConfig, Pipeline, PipelineOutcome, Profile, Step, StepFailure, StepState,
};
pub use crate::execution::{
    CommandOutput, CommandRunner, DeployEngine, ExecutionEvent, RunOptions, RunReport, RunnerError,
    SystemCommandRunner,
};
