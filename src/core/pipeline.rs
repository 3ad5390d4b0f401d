//! Pipeline domain model

use crate::core::{
    config::{DeployConfig, StepConfig},
    step::{render_token, Step},
};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which built-in step sequence to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Pull, install, audit, reload, persist, probe, proxy, status
    #[default]
    Full,
    /// Pull and reload without dependency install or health probe
    Light,
    /// Reload the app and restart the proxy without touching the source
    Restart,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Full => write!(f, "full"),
            Profile::Light => write!(f, "light"),
            Profile::Restart => write!(f, "restart"),
        }
    }
}

/// An ordered, immutable list of steps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Pipeline name, shown in banners
    pub name: String,

    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    /// Build the pipeline for a configuration
    ///
    /// Custom `steps` in the configuration take precedence over the profile.
    pub fn from_config(config: &DeployConfig, profile: Profile) -> Result<Self> {
        let mut steps = match &config.steps {
            Some(custom) => custom_steps(config, custom)?,
            None => {
                let commands = Commands::new(config);
                match profile {
                    Profile::Full => commands.full(),
                    Profile::Light => commands.light(),
                    Profile::Restart => commands.restart(),
                }
            }
        };

        apply_step_pause(&mut steps, Duration::from_secs(config.step_pause_secs));

        let name = match &config.steps {
            Some(_) => format!("{} (custom)", config.app_name),
            None => format!("{} ({})", config.app_name, profile),
        };

        Ok(Self::new(name, steps))
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Step names in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Fill in the configured pause on steps that have no delay of their own
fn apply_step_pause(steps: &mut [Step], pause: Duration) {
    if pause.is_zero() {
        return;
    }
    let last = steps.len().saturating_sub(1);
    for step in steps.iter_mut().take(last) {
        if step.post_delay.is_zero() {
            step.post_delay = pause;
        }
    }
}

fn custom_steps(config: &DeployConfig, custom: &[StepConfig]) -> Result<Vec<Step>> {
    let values = config.placeholder_values();

    custom
        .iter()
        .map(|step_config| {
            let command = step_config
                .run
                .iter()
                .map(|token| {
                    render_token(token, &values).map_err(|missing| {
                        anyhow::anyhow!(
                            "Step '{}' needs '{}' but it is not configured",
                            step_config.name,
                            missing
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let description = step_config
                .description
                .clone()
                .unwrap_or_else(|| step_config.name.clone());

            let mut step = Step::new(
                step_config.name.clone(),
                description,
                step_config.criticality,
                command,
            )
            .with_post_delay(Duration::from_secs(step_config.post_delay_secs));

            if step_config.capture_output {
                step = step.capturing();
            }
            if let Some(secs) = step_config.timeout_secs {
                step = step.with_timeout(Duration::from_secs(secs));
            }

            Ok(step)
        })
        .collect()
}

/// Builds the argument lists for every external collaborator
struct Commands<'a> {
    config: &'a DeployConfig,
}

impl<'a> Commands<'a> {
    fn new(config: &'a DeployConfig) -> Self {
        Self { config }
    }

    fn settle(&self) -> Duration {
        Duration::from_secs(self.config.settle_delay_secs)
    }

    fn full(&self) -> Vec<Step> {
        vec![
            self.fetch(),
            self.pull(),
            self.install_dependencies(),
            self.audit_dependencies(),
            self.reload_app(),
            self.save_process_list().with_post_delay(self.settle()),
            self.health_check(),
            self.validate_proxy_config(),
            self.reload_proxy(),
            self.supervisor_status(),
            self.proxy_status(),
        ]
    }

    fn light(&self) -> Vec<Step> {
        vec![
            self.fetch(),
            self.pull(),
            self.reload_app(),
            self.save_process_list().with_post_delay(self.settle()),
            self.validate_proxy_config(),
            self.reload_proxy(),
            self.proxy_status(),
            self.supervisor_status(),
        ]
    }

    fn restart(&self) -> Vec<Step> {
        vec![
            self.reload_app(),
            self.supervisor_status(),
            self.validate_proxy_config().with_post_delay(self.settle()),
            self.restart_proxy(),
            self.proxy_status(),
        ]
    }

    fn git(&self, args: &[&str]) -> Vec<String> {
        std::iter::once(self.config.tools.git.as_str())
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    fn supervisor(&self, args: &[&str]) -> Vec<String> {
        std::iter::once(self.config.tools.supervisor.as_str())
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    fn privileged(&self, program: &str, args: &[&str]) -> Vec<String> {
        let sudo = self.config.proxy.use_sudo.then_some("sudo");
        sudo.into_iter()
            .chain(std::iter::once(program))
            .chain(args.iter().copied())
            .map(String::from)
            .collect()
    }

    fn service(&self, action: &str, extra: &[&str]) -> Vec<String> {
        let mut args = vec![action, self.config.proxy.service.as_str()];
        args.extend_from_slice(extra);
        self.privileged(&self.config.tools.service_manager, &args)
    }

    fn fetch(&self) -> Step {
        Step::blocking(
            "fetch",
            "Fetching latest changes",
            self.git(&["fetch", "--all"]),
        )
    }

    fn pull(&self) -> Step {
        let command = match &self.config.branch {
            Some(branch) => self.git(&["pull", self.config.remote.as_str(), branch.as_str()]),
            None => self.git(&["pull"]),
        };
        let description = match &self.config.branch {
            Some(branch) => format!("Pulling latest changes from {}", branch),
            None => "Pulling latest changes".to_string(),
        };
        Step::blocking("pull", description, command)
    }

    fn install_dependencies(&self) -> Step {
        Step::blocking(
            "install_dependencies",
            "Installing dependencies",
            [self.config.tools.package_manager.as_str(), "install"],
        )
    }

    fn audit_dependencies(&self) -> Step {
        Step::advisory(
            "audit_dependencies",
            "Auditing dependencies",
            [self.config.tools.package_manager.as_str(), "audit"],
        )
    }

    fn reload_app(&self) -> Step {
        let app = self.config.app_name.as_str();
        let command = match &self.config.ecosystem_file {
            Some(file) => self.supervisor(&["reload", file.as_str(), "--only", app, "--update-env"]),
            None => self.supervisor(&["reload", app, "--update-env"]),
        };
        Step::blocking(
            "reload_app",
            format!("Reloading {} through {}", app, self.config.tools.supervisor),
            command,
        )
    }

    fn save_process_list(&self) -> Step {
        Step::blocking(
            "save_process_list",
            "Saving supervisor process list",
            self.supervisor(&["save"]),
        )
    }

    fn health_check(&self) -> Step {
        let health = &self.config.health_check;
        let retries = health.retries.to_string();
        let delay = health.retry_delay_secs.to_string();
        Step::blocking(
            "health_check",
            format!("Verifying {} is serving on port {}", self.config.app_name, self.config.port),
            [
                self.config.tools.http_probe.clone(),
                "-f".to_string(),
                "-I".to_string(),
                "--retry".to_string(),
                retries,
                "--retry-delay".to_string(),
                delay,
                "--retry-connrefused".to_string(),
                self.config.health_check_url(),
            ],
        )
    }

    fn validate_proxy_config(&self) -> Step {
        Step::blocking(
            "validate_proxy_config",
            format!("Verifying {} configuration", self.config.proxy.service),
            self.privileged(&self.config.tools.proxy_binary, &["-t"]),
        )
    }

    fn reload_proxy(&self) -> Step {
        Step::blocking(
            "reload_proxy",
            format!("Reloading {}", self.config.proxy.service),
            self.service("reload", &[]),
        )
    }

    fn restart_proxy(&self) -> Step {
        Step::blocking(
            "restart_proxy",
            format!("Restarting {}", self.config.proxy.service),
            self.service("restart", &[]),
        )
    }

    fn supervisor_status(&self) -> Step {
        Step::advisory(
            "supervisor_status",
            format!("Checking {} status for {}", self.config.tools.supervisor, self.config.app_name),
            self.supervisor(&["status", self.config.app_name.as_str()]),
        )
    }

    fn proxy_status(&self) -> Step {
        Step::advisory(
            "proxy_status",
            format!("Checking {} status", self.config.proxy.service),
            self.service("status", &["--no-pager"]),
        )
    }
}
