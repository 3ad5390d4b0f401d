//! Main execution engine - runs a pipeline's steps in order with fail-fast semantics

use crate::{
    core::{Criticality, Pipeline, PipelineOutcome, PipelineState, StepFailure, StepState},
    execution::{CommandRunner, StepExecutor},
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during pipeline execution
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    PipelineStarted {
        execution_id: Uuid,
        pipeline_name: String,
        total_steps: usize,
    },
    StepStarted {
        /// 1-based position in the pipeline
        index: usize,
        total: usize,
        step_name: String,
        description: String,
        command_line: String,
    },
    StepSucceeded {
        step_name: String,
        output: Option<String>,
    },
    StepFailed {
        step_name: String,
        command_line: String,
        exit_code: i32,
        criticality: Criticality,
        /// Captured stdout, when the step captures output
        output: Option<String>,
        stderr: Option<String>,
    },
    Settling {
        step_name: String,
        delay: Duration,
    },
    Settled {
        step_name: String,
    },
    StepsSkipped {
        step_names: Vec<String>,
    },
    PipelineCompleted {
        execution_id: Uuid,
        outcome: PipelineOutcome,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Final state of one step after a run
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub state: StepState,
}

/// Everything one run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline_name: String,
    pub state: PipelineState,
    pub steps: Vec<StepRecord>,
    /// Non-zero exits that did not halt the run
    pub advisory_failures: Vec<StepFailure>,
    pub outcome: PipelineOutcome,
}

impl RunReport {
    pub fn execution_id(&self) -> Uuid {
        self.state.execution_id
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Get the final state of a step
    pub fn step_state(&self, name: &str) -> Option<&StepState> {
        self.steps.iter().find(|r| r.name == name).map(|r| &r.state)
    }

    /// Names of the steps whose command was invoked, in order
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|r| r.state.was_executed())
            .map(|r| r.name.as_str())
            .collect()
    }

    /// Names of the steps that never ran
    pub fn skipped_steps(&self) -> Vec<&str> {
        self.steps
            .iter()
            .filter(|r| matches!(r.state, StepState::Skipped { .. }))
            .map(|r| r.name.as_str())
            .collect()
    }
}

/// Main pipeline execution engine
pub struct DeployEngine<R> {
    executor: StepExecutor<R>,
    event_handlers: Vec<EventHandler>,
}

impl<R: CommandRunner> DeployEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            event_handlers: Vec::new(),
        }
    }

    pub fn runner(&self) -> &R {
        self.executor.runner()
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    /// Execute the entire pipeline
    ///
    /// Steps run one at a time. The first blocking step that exits non-zero
    /// ends the run; every later step is recorded as skipped.
    pub async fn run(&self, pipeline: &Pipeline) -> RunReport {
        let mut state = PipelineState::new();
        let execution_id = state.execution_id;
        let total = pipeline.len();

        info!("Starting pipeline execution: {} ({})", pipeline.name, execution_id);
        self.emit_event(ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name: pipeline.name.clone(),
            total_steps: total,
        });

        state.start(total);

        let mut records: Vec<StepRecord> = pipeline
            .steps
            .iter()
            .map(|step| StepRecord {
                name: step.name.clone(),
                state: StepState::Pending,
            })
            .collect();
        let mut advisory_failures = Vec::new();
        let mut outcome = PipelineOutcome::Success;

        for (index, step) in pipeline.steps.iter().enumerate() {
            let started_at = Utc::now();
            records[index].state = StepState::Running { started_at };

            self.emit_event(ExecutionEvent::StepStarted {
                index: index + 1,
                total,
                step_name: step.name.clone(),
                description: step.description.clone(),
                command_line: step.command_line(),
            });

            let result = self.executor.execute(step).await;

            if result.success() {
                state.completed_steps += 1;
                records[index].state = StepState::Succeeded {
                    started_at,
                    completed_at: Utc::now(),
                };
                self.emit_event(ExecutionEvent::StepSucceeded {
                    step_name: step.name.clone(),
                    output: result.stdout,
                });
            } else {
                state.failed_steps += 1;
                records[index].state = StepState::Failed {
                    exit_code: result.exit_code,
                    criticality: step.criticality,
                    started_at,
                    failed_at: Utc::now(),
                };
                self.emit_event(ExecutionEvent::StepFailed {
                    step_name: step.name.clone(),
                    command_line: step.command_line(),
                    exit_code: result.exit_code,
                    criticality: step.criticality,
                    output: result.stdout,
                    stderr: result.stderr,
                });

                match StepFailure::new(step.criticality, step.name.clone(), result.exit_code) {
                    StepFailure::Blocking { step: name, exit_code } => {
                        error!(
                            "Blocking step {} failed with exit code {}; halting",
                            name, exit_code
                        );
                        outcome = PipelineOutcome::FailedAt {
                            step: name,
                            exit_code,
                        };
                        break;
                    }
                    advisory => {
                        warn!("{}; continuing", advisory);
                        advisory_failures.push(advisory);
                    }
                }
            }

            let is_last = index + 1 == total;
            if !is_last && !step.post_delay.is_zero() {
                self.emit_event(ExecutionEvent::Settling {
                    step_name: step.name.clone(),
                    delay: step.post_delay,
                });
                tokio::time::sleep(step.post_delay).await;
                self.emit_event(ExecutionEvent::Settled {
                    step_name: step.name.clone(),
                });
            }
        }

        if let PipelineOutcome::FailedAt { step, .. } = &outcome {
            let reason = format!("{} failed", step);
            let skipped: Vec<String> = records
                .iter_mut()
                .filter(|r| matches!(r.state, StepState::Pending))
                .map(|r| {
                    r.state = StepState::Skipped {
                        reason: reason.clone(),
                    };
                    r.name.clone()
                })
                .collect();
            if !skipped.is_empty() {
                self.emit_event(ExecutionEvent::StepsSkipped { step_names: skipped });
            }
            state.fail();
        } else {
            state.complete();
        }

        info!(
            "Pipeline execution finished: {} - {:?}",
            pipeline.name, state.status
        );
        self.emit_event(ExecutionEvent::PipelineCompleted {
            execution_id,
            outcome: outcome.clone(),
        });

        RunReport {
            pipeline_name: pipeline.name.clone(),
            state,
            steps: records,
            advisory_failures,
            outcome,
        }
    }
}
