//! Test utility functions for deployment scenarios

use async_trait::async_trait;
use redeploy::core::{DeployConfig, Pipeline, PipelineOutcome, Profile, StepState};
use redeploy::execution::{
    CommandOutput, CommandRunner, DeployEngine, RunOptions, RunReport, RunnerError,
};
use std::sync::{Arc, Mutex};

/// One recorded command invocation
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: Vec<String>,
    pub at: tokio::time::Instant,
}

/// What the mock does when a rule matches
#[derive(Debug, Clone)]
enum Reply {
    Exit(i32),
    Print(String),
    SpawnFailure,
}

/// Mock runner that exits 0 unless a rule matches the command's leading tokens
#[derive(Default)]
pub struct MockRunner {
    rules: Vec<(Vec<String>, Reply)>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, prefix: &[&str], reply: Reply) -> Self {
        self.rules
            .push((prefix.iter().map(|t| t.to_string()).collect(), reply));
        self
    }

    /// Make any command starting with `prefix` exit with `code`
    pub fn exit_with(self, prefix: &[&str], code: i32) -> Self {
        self.rule(prefix, Reply::Exit(code))
    }

    /// Make any command starting with `prefix` exit 0 printing `stdout`
    pub fn prints(self, prefix: &[&str], stdout: &str) -> Self {
        self.rule(prefix, Reply::Print(stdout.to_string()))
    }

    /// Make any command starting with `prefix` fail to spawn
    pub fn cannot_spawn(self, prefix: &[&str]) -> Self {
        self.rule(prefix, Reply::SpawnFailure)
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|i| i.command.join(" "))
            .collect()
    }

    pub fn was_invoked(&self, prefix: &[&str]) -> bool {
        self.invocations()
            .iter()
            .any(|i| i.command.iter().map(String::as_str).take(prefix.len()).eq(prefix.iter().copied()))
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &[String], _options: RunOptions) -> Result<CommandOutput, RunnerError> {
        self.invocations.lock().unwrap().push(Invocation {
            command: command.to_vec(),
            at: tokio::time::Instant::now(),
        });

        let reply = self
            .rules
            .iter()
            .find(|(prefix, _)| command.starts_with(prefix))
            .map(|(_, reply)| reply.clone())
            .unwrap_or(Reply::Exit(0));

        match reply {
            Reply::Exit(code) => Ok(CommandOutput {
                exit_code: Some(code),
                stdout: None,
                stderr: None,
            }),
            Reply::Print(stdout) => Ok(CommandOutput {
                exit_code: Some(0),
                stdout: Some(stdout),
                stderr: Some(String::new()),
            }),
            Reply::SpawnFailure => Err(RunnerError::Spawn {
                program: command[0].clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }
}

/// The configuration every scenario deploys
pub fn test_config() -> DeployConfig {
    let mut config = DeployConfig::new("keysocket", 3000);
    config.branch = Some("main".to_string());
    config.settle_delay_secs = 0;
    config
}

pub fn full_pipeline() -> Pipeline {
    Pipeline::from_config(&test_config(), Profile::Full).unwrap()
}

/// Run a pipeline with a mock runner, returning the report and the runner
pub async fn run_with_mock(pipeline: &Pipeline, runner: MockRunner) -> (RunReport, DeployEngine<MockRunner>) {
    let engine = DeployEngine::new(runner);
    let report = engine.run(pipeline).await;
    (report, engine)
}

/// Assert the run succeeded
pub fn assert_success(report: &RunReport) {
    assert_eq!(
        report.outcome,
        PipelineOutcome::Success,
        "Pipeline should succeed; steps: {:?}",
        report.steps
    );
}

/// Assert the run halted at `step` with `exit_code`
pub fn assert_failed_at(report: &RunReport, step: &str, exit_code: i32) {
    assert_eq!(report.outcome, PipelineOutcome::failed_at(step, exit_code));
}

/// Assert nothing after `step` ran
pub fn assert_nothing_after(report: &RunReport, step: &str) {
    let position = report
        .steps
        .iter()
        .position(|r| r.name == step)
        .unwrap_or_else(|| panic!("Step '{}' not in report", step));

    for record in &report.steps[position + 1..] {
        assert!(
            matches!(record.state, StepState::Skipped { .. }),
            "Step '{}' should be skipped after '{}' failed, got {:?}",
            record.name,
            step,
            record.state
        );
    }
}
