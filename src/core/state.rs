//! Execution state models

use crate::core::step::Criticality;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Overall pipeline execution status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Pipeline has not started
    Pending,
    /// Pipeline is currently running
    Running,
    /// Every blocking step succeeded
    Completed,
    /// A blocking step failed
    Failed,
}

/// State of a single step within one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepState {
    /// Step has not been reached yet
    Pending,
    /// Step command is running
    Running {
        started_at: DateTime<Utc>,
    },
    /// Step command exited with code 0
    Succeeded {
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
    },
    /// Step command exited non-zero (or could not run at all)
    Failed {
        exit_code: i32,
        criticality: Criticality,
        started_at: DateTime<Utc>,
        failed_at: DateTime<Utc>,
    },
    /// Step was never started because an earlier blocking step failed
    Skipped {
        reason: String,
    },
}

impl StepState {
    /// Whether the step's command was actually invoked
    pub fn was_executed(&self) -> bool {
        matches!(
            self,
            StepState::Running { .. } | StepState::Succeeded { .. } | StepState::Failed { .. }
        )
    }
}

/// Overall pipeline state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    /// Unique execution ID
    pub execution_id: Uuid,

    /// Current execution status
    pub status: ExecutionStatus,

    /// When execution started
    pub started_at: Option<DateTime<Utc>>,

    /// When execution completed/failed
    pub completed_at: Option<DateTime<Utc>>,

    /// Total number of steps
    pub total_steps: usize,

    /// Number of steps whose command exited 0
    pub completed_steps: usize,

    /// Number of steps whose command exited non-zero (advisory included)
    pub failed_steps: usize,
}

impl PipelineState {
    /// Create a new pipeline state
    pub fn new() -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            status: ExecutionStatus::Pending,
            started_at: None,
            completed_at: None,
            total_steps: 0,
            completed_steps: 0,
            failed_steps: 0,
        }
    }

    /// Mark pipeline as started
    pub fn start(&mut self, total_steps: usize) {
        self.status = ExecutionStatus::Running;
        self.started_at = Some(Utc::now());
        self.total_steps = total_steps;
    }

    /// Mark pipeline as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Mark pipeline as failed
    pub fn fail(&mut self) {
        self.status = ExecutionStatus::Failed;
        self.completed_at = Some(Utc::now());
    }

    /// Calculate progress (0.0 to 1.0)
    pub fn progress(&self) -> f64 {
        if self.total_steps == 0 {
            return 0.0;
        }
        (self.completed_steps + self.failed_steps) as f64 / self.total_steps as f64
    }
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::new()
    }
}

/// A step that exited non-zero, classified by how it affects the run
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum StepFailure {
    /// Halts the pipeline and becomes a non-zero process exit
    #[error("blocking step '{step}' failed with exit code {exit_code}")]
    Blocking { step: String, exit_code: i32 },

    /// Logged and recorded, never halts the pipeline
    #[error("advisory step '{step}' exited with code {exit_code}")]
    Advisory { step: String, exit_code: i32 },
}

impl StepFailure {
    pub fn new(criticality: Criticality, step: impl Into<String>, exit_code: i32) -> Self {
        let step = step.into();
        match criticality {
            Criticality::Blocking => StepFailure::Blocking { step, exit_code },
            Criticality::Advisory => StepFailure::Advisory { step, exit_code },
        }
    }

    pub fn step(&self) -> &str {
        match self {
            StepFailure::Blocking { step, .. } | StepFailure::Advisory { step, .. } => step,
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            StepFailure::Blocking { exit_code, .. } | StepFailure::Advisory { exit_code, .. } => {
                *exit_code
            }
        }
    }
}

/// Terminal value of one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineOutcome {
    Success,
    FailedAt { step: String, exit_code: i32 },
}

impl PipelineOutcome {
    pub fn failed_at(step: impl Into<String>, exit_code: i32) -> Self {
        PipelineOutcome::FailedAt {
            step: step.into(),
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success)
    }

    /// Convert into a `Result`, surfacing the blocking failure as an error
    pub fn into_result(self) -> Result<(), StepFailure> {
        match self {
            PipelineOutcome::Success => Ok(()),
            PipelineOutcome::FailedAt { step, exit_code } => {
                Err(StepFailure::Blocking { step, exit_code })
            }
        }
    }
}
