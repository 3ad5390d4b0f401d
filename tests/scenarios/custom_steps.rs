//! Test: Data-driven step lists from YAML

use crate::helpers::*;
use redeploy::core::{DeployConfig, Pipeline, Profile};

#[tokio::test]
async fn test_custom_steps_run_in_declared_order() {
    let yaml = r#"
app_name: "api"
port: 8080
branch: "release"
steps:
  - name: "pull"
    run: ["git", "pull", "{{ remote }}", "{{ branch }}"]
  - name: "lint"
    run: ["npm", "run", "lint"]
    criticality: advisory
  - name: "reload"
    run: ["pm2", "reload", "{{ app_name }}"]
  - name: "probe"
    run: ["curl", "-f", "http://localhost:{{ port }}/"]
"#;

    let config = DeployConfig::from_yaml(yaml).unwrap();
    let pipeline = Pipeline::from_config(&config, Profile::Full).unwrap();
    let runner = MockRunner::new().exit_with(&["npm", "run", "lint"], 1);

    let (report, engine) = run_with_mock(&pipeline, runner).await;

    assert_success(&report);
    assert_eq!(
        engine.runner().commands(),
        vec![
            "git pull origin release",
            "npm run lint",
            "pm2 reload api",
            "curl -f http://localhost:8080/",
        ]
    );
}

#[tokio::test]
async fn test_custom_blocking_step_halts() {
    let yaml = r#"
app_name: "api"
port: 8080
steps:
  - name: "migrate"
    run: ["npm", "run", "migrate"]
  - name: "reload"
    run: ["pm2", "reload", "{{ app_name }}"]
"#;

    let config = DeployConfig::from_yaml(yaml).unwrap();
    let pipeline = Pipeline::from_config(&config, Profile::Full).unwrap();
    let runner = MockRunner::new().exit_with(&["npm", "run", "migrate"], 2);

    let (report, engine) = run_with_mock(&pipeline, runner).await;

    assert_failed_at(&report, "migrate", 2);
    assert!(!engine.runner().was_invoked(&["pm2"]));
}
