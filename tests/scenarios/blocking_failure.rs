//! Test: Blocking failures halt the pipeline

use crate::helpers::*;
use redeploy::core::{Criticality, StepState};

/// Proxy config validation fails: the proxy is never reloaded, the app stays reloaded
#[tokio::test]
async fn test_invalid_proxy_config_halts_before_reload() {
    let runner = MockRunner::new().exit_with(&["sudo", "nginx", "-t"], 1);

    let (report, engine) = run_with_mock(&full_pipeline(), runner).await;

    assert_failed_at(&report, "validate_proxy_config", 1);
    assert_nothing_after(&report, "validate_proxy_config");

    // The app reload already happened and is not rolled back
    assert!(engine.runner().was_invoked(&["pm2", "reload", "keysocket"]));
    assert!(matches!(
        report.step_state("reload_app"),
        Some(StepState::Succeeded { .. })
    ));

    // The proxy reload was never attempted
    assert!(!engine.runner().was_invoked(&["sudo", "systemctl", "reload"]));
}

/// Health probe exhausts its retries: no proxy step runs
#[tokio::test]
async fn test_failed_health_check_halts_before_proxy() {
    // curl -f reports HTTP errors with exit code 22
    let runner = MockRunner::new().exit_with(&["curl"], 22);

    let (report, engine) = run_with_mock(&full_pipeline(), runner).await;

    assert_failed_at(&report, "health_check", 22);
    assert_nothing_after(&report, "health_check");
    assert!(!engine.runner().was_invoked(&["sudo", "nginx"]));
    assert!(!engine.runner().was_invoked(&["sudo", "systemctl"]));
}

/// Dependency install fails: nothing is reloaded
#[tokio::test]
async fn test_failed_install_leaves_service_untouched() {
    let runner = MockRunner::new().exit_with(&["npm", "install"], 1);

    let (report, engine) = run_with_mock(&full_pipeline(), runner).await;

    assert_failed_at(&report, "install_dependencies", 1);
    assert_eq!(
        report.executed_steps(),
        vec!["fetch", "pull", "install_dependencies"]
    );
    assert!(!engine.runner().was_invoked(&["pm2"]));
}

/// Persisting the process list is blocking
#[tokio::test]
async fn test_failed_save_halts() {
    let runner = MockRunner::new().exit_with(&["pm2", "save"], 1);

    let (report, _engine) = run_with_mock(&full_pipeline(), runner).await;

    assert_failed_at(&report, "save_process_list", 1);
    assert_nothing_after(&report, "save_process_list");
}

/// For every blocking step: failing it stops everything after it
#[tokio::test]
async fn test_any_blocking_failure_stops_later_steps() {
    let pipeline = full_pipeline();

    for (index, step) in pipeline.steps.iter().enumerate() {
        if step.criticality != Criticality::Blocking {
            continue;
        }

        let tokens: Vec<&str> = step.command.iter().map(String::as_str).collect();
        let runner = MockRunner::new().exit_with(&tokens, 3);
        let (report, engine) = run_with_mock(&pipeline, runner).await;

        assert_failed_at(&report, &step.name, 3);
        assert_eq!(
            engine.runner().invocations().len(),
            index + 1,
            "Only steps up to '{}' should run",
            step.name
        );
        assert_eq!(report.skipped_steps().len(), pipeline.len() - index - 1);
    }
}

/// A command that cannot be spawned counts as a blocking failure
#[tokio::test]
async fn test_unspawnable_command_halts() {
    use redeploy::core::{Pipeline, Step};
    use redeploy::execution::{DeployEngine, SystemCommandRunner};

    let pipeline = Pipeline::new(
        "missing binary",
        vec![
            Step::blocking("reload_app", "Reload", ["redeploy-test-no-such-supervisor", "reload"]),
            Step::blocking("never", "Never", ["redeploy-test-no-such-proxy"]),
        ],
    );

    let engine = DeployEngine::new(SystemCommandRunner::new());
    let report = engine.run(&pipeline).await;

    assert_failed_at(&report, "reload_app", 127);
    assert_eq!(report.skipped_steps(), vec!["never"]);
}
