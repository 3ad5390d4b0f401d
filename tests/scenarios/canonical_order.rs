//! Test: The full profile runs the canonical steps in order

use crate::helpers::*;
use redeploy::core::{Pipeline, Profile};
use std::time::Duration;

/// Happy path runs every step once, in order
#[tokio::test]
async fn test_full_deploy_runs_in_order() {
    let (report, engine) = run_with_mock(&full_pipeline(), MockRunner::new()).await;

    assert_success(&report);
    assert_eq!(
        report.executed_steps(),
        vec![
            "fetch",
            "pull",
            "install_dependencies",
            "audit_dependencies",
            "reload_app",
            "save_process_list",
            "health_check",
            "validate_proxy_config",
            "reload_proxy",
            "supervisor_status",
            "proxy_status",
        ]
    );

    assert_eq!(
        engine.runner().commands(),
        vec![
            "git fetch --all",
            "git pull origin main",
            "npm install",
            "npm audit",
            "pm2 reload keysocket --update-env",
            "pm2 save",
            "curl -f -I --retry 3 --retry-delay 1 --retry-connrefused http://localhost:3000/",
            "sudo nginx -t",
            "sudo systemctl reload nginx",
            "pm2 status keysocket",
            "sudo systemctl status nginx --no-pager",
        ]
    );
}

/// The settle delay separates persisting the process list from the probe
#[tokio::test(start_paused = true)]
async fn test_settle_delay_before_health_check() {
    let mut config = test_config();
    config.settle_delay_secs = 3;
    let pipeline = Pipeline::from_config(&config, Profile::Full).unwrap();

    let (report, engine) = run_with_mock(&pipeline, MockRunner::new()).await;
    assert_success(&report);

    let invocations = engine.runner().invocations();
    let save = invocations
        .iter()
        .find(|i| i.command.join(" ") == "pm2 save")
        .unwrap();
    let probe = invocations
        .iter()
        .find(|i| i.command[0] == "curl")
        .unwrap();

    assert_eq!(probe.at - save.at, Duration::from_secs(3));
}

/// The light profile follows the early script revision
#[tokio::test]
async fn test_light_profile() {
    let pipeline = Pipeline::from_config(&test_config(), Profile::Light).unwrap();

    let (report, engine) = run_with_mock(&pipeline, MockRunner::new()).await;

    assert_success(&report);
    assert!(!engine.runner().was_invoked(&["npm"]));
    assert!(!engine.runner().was_invoked(&["curl"]));
    assert!(engine.runner().was_invoked(&["sudo", "nginx", "-t"]));
}

/// The restart profile never touches the working copy
#[tokio::test]
async fn test_restart_profile() {
    let pipeline = Pipeline::from_config(&test_config(), Profile::Restart).unwrap();

    let (report, engine) = run_with_mock(&pipeline, MockRunner::new()).await;

    assert_success(&report);
    assert!(!engine.runner().was_invoked(&["git"]));
    assert!(engine.runner().was_invoked(&["sudo", "systemctl", "restart", "nginx"]));
}

/// Restart with a broken proxy config never restarts the proxy
#[tokio::test]
async fn test_restart_profile_validates_proxy_first() {
    let pipeline = Pipeline::from_config(&test_config(), Profile::Restart).unwrap();
    let runner = MockRunner::new().exit_with(&["sudo", "nginx", "-t"], 1);

    let (report, engine) = run_with_mock(&pipeline, runner).await;

    assert_failed_at(&report, "validate_proxy_config", 1);
    assert!(!engine.runner().was_invoked(&["sudo", "systemctl", "restart"]));
}
