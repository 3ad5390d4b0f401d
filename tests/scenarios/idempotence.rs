//! Test: Re-running an unchanged deployment succeeds again

use crate::helpers::*;
use redeploy::execution::DeployEngine;

#[tokio::test]
async fn test_two_runs_both_succeed() {
    let pipeline = full_pipeline();
    let engine = DeployEngine::new(MockRunner::new());

    let first = engine.run(&pipeline).await;
    let second = engine.run(&pipeline).await;

    assert_success(&first);
    assert_success(&second);
    assert_ne!(first.execution_id(), second.execution_id());
    assert_eq!(first.executed_steps(), second.executed_steps());

    // Both runs issued the same commands
    let commands = engine.runner().commands();
    assert_eq!(commands.len(), pipeline.len() * 2);
    assert_eq!(commands[..pipeline.len()], commands[pipeline.len()..]);
}

/// A failed run does not leave state behind that affects the next one
#[tokio::test]
async fn test_run_after_failure_starts_fresh() {
    let pipeline = full_pipeline();

    let failing = DeployEngine::new(MockRunner::new().exit_with(&["curl"], 7));
    let failed = failing.run(&pipeline).await;
    assert_failed_at(&failed, "health_check", 7);

    let healthy = DeployEngine::new(MockRunner::new());
    let recovered = healthy.run(&pipeline).await;
    assert_success(&recovered);
    assert!(recovered.skipped_steps().is_empty());
}
