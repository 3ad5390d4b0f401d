//! Deployment configuration from YAML

use crate::core::step::{placeholders, Criticality};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Placeholders a custom step command may reference
pub const KNOWN_PLACEHOLDERS: &[&str] = &["app_name", "port", "branch", "remote"];

/// Top-level deployment configuration
///
/// `app_name` and `port` may be omitted from the file and supplied on the
/// command line instead; `validate` runs once all sources are merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Process supervisor app name
    #[serde(default)]
    pub app_name: String,

    /// Port the application listens on
    #[serde(default)]
    pub port: u16,

    /// Branch to pull; resolved from the working copy when absent
    #[serde(default)]
    pub branch: Option<String>,

    /// Remote to pull from
    #[serde(default = "default_remote")]
    pub remote: String,

    /// Supervisor ecosystem file; reloads go through it when set
    #[serde(default)]
    pub ecosystem_file: Option<String>,

    /// Pause after the supervisor settles, before the app is probed
    #[serde(default = "default_settle_delay_secs")]
    pub settle_delay_secs: u64,

    /// Pause after every other step
    #[serde(default)]
    pub step_pause_secs: u64,

    #[serde(default)]
    pub health_check: HealthCheckConfig,

    #[serde(default)]
    pub proxy: ProxyConfig,

    #[serde(default)]
    pub tools: ToolsConfig,

    /// Explicit step list, replacing the built-in profile
    #[serde(default)]
    pub steps: Option<Vec<StepConfig>>,
}

/// HTTP probe settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    #[serde(default = "default_health_host")]
    pub host: String,

    #[serde(default = "default_health_path")]
    pub path: String,

    /// Attempts the probe makes before giving up
    #[serde(default = "default_health_retries")]
    pub retries: u32,

    #[serde(default = "default_health_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

/// Reverse proxy settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Service name known to the service manager
    #[serde(default = "default_proxy_service")]
    pub service: String,

    /// Prefix proxy commands with `sudo`
    #[serde(default = "default_true")]
    pub use_sudo: bool,
}

/// Executables for each external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_package_manager")]
    pub package_manager: String,

    #[serde(default = "default_supervisor")]
    pub supervisor: String,

    #[serde(default = "default_proxy_binary")]
    pub proxy_binary: String,

    #[serde(default = "default_service_manager")]
    pub service_manager: String,

    #[serde(default = "default_http_probe")]
    pub http_probe: String,
}

/// Custom step as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Unique step name
    pub name: String,

    /// Banner text; defaults to the name
    #[serde(default)]
    pub description: Option<String>,

    /// Program and arguments, one token per entry
    pub run: Vec<String>,

    #[serde(default)]
    pub criticality: Criticality,

    #[serde(default)]
    pub post_delay_secs: u64,

    #[serde(default)]
    pub capture_output: bool,

    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_remote() -> String {
    "origin".to_string()
}

fn default_settle_delay_secs() -> u64 {
    3
}

fn default_health_host() -> String {
    "localhost".to_string()
}

fn default_health_path() -> String {
    "/".to_string()
}

fn default_health_retries() -> u32 {
    3
}

fn default_health_retry_delay_secs() -> u64 {
    1
}

fn default_proxy_service() -> String {
    "nginx".to_string()
}

fn default_true() -> bool {
    true
}

fn default_git() -> String {
    "git".to_string()
}

fn default_package_manager() -> String {
    "npm".to_string()
}

fn default_supervisor() -> String {
    "pm2".to_string()
}

fn default_proxy_binary() -> String {
    "nginx".to_string()
}

fn default_service_manager() -> String {
    "systemctl".to_string()
}

fn default_http_probe() -> String {
    "curl".to_string()
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            host: default_health_host(),
            path: default_health_path(),
            retries: default_health_retries(),
            retry_delay_secs: default_health_retry_delay_secs(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            service: default_proxy_service(),
            use_sudo: true,
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            package_manager: default_package_manager(),
            supervisor: default_supervisor(),
            proxy_binary: default_proxy_binary(),
            service_manager: default_service_manager(),
            http_probe: default_http_probe(),
        }
    }
}

impl DeployConfig {
    /// Configuration with every optional setting at its default
    pub fn new(app_name: impl Into<String>, port: u16) -> Self {
        Self {
            app_name: app_name.into(),
            port,
            branch: None,
            remote: default_remote(),
            ecosystem_file: None,
            settle_delay_secs: default_settle_delay_secs(),
            step_pause_secs: 0,
            health_check: HealthCheckConfig::default(),
            proxy: ProxyConfig::default(),
            tools: ToolsConfig::default(),
            steps: None,
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Self::parse_file(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file without validating it
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse_yaml(&content).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = Self::parse_yaml(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string without validating it
    pub fn parse_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            anyhow::bail!("app_name is required");
        }
        if self.port == 0 {
            anyhow::bail!("port is required and must be non-zero");
        }
        if let Some(branch) = &self.branch {
            validate_ref_name("branch", branch)?;
        }
        validate_ref_name("remote", &self.remote)?;
        if self.health_check.retries == 0 {
            anyhow::bail!("health_check.retries must be at least 1");
        }
        if !self.health_check.path.starts_with('/') {
            anyhow::bail!(
                "health_check.path must start with '/': {}",
                self.health_check.path
            );
        }

        if let Some(steps) = &self.steps {
            self.validate_steps(steps)?;
        }

        Ok(())
    }

    fn validate_steps(&self, steps: &[StepConfig]) -> Result<()> {
        if steps.is_empty() {
            anyhow::bail!("steps must not be empty when provided");
        }

        let mut seen_names = HashSet::new();
        for step in steps {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step names must not be empty");
            }
            if !seen_names.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }
            if step.run.first().is_none_or(|program| program.trim().is_empty()) {
                anyhow::bail!("Step '{}' has an empty command", step.name);
            }

            for token in &step.run {
                for name in placeholders(token) {
                    if !KNOWN_PLACEHOLDERS.contains(&name.as_str()) {
                        anyhow::bail!(
                            "Step '{}' references unknown placeholder '{{{{ {} }}}}'",
                            step.name,
                            name
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Values available to `{{ name }}` placeholders
    ///
    /// `branch` is only present once it has been configured or resolved.
    pub fn placeholder_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        values.insert("app_name".to_string(), self.app_name.clone());
        values.insert("port".to_string(), self.port.to_string());
        values.insert("remote".to_string(), self.remote.clone());
        if let Some(branch) = &self.branch {
            values.insert("branch".to_string(), branch.clone());
        }
        values
    }

    /// Whether the step list refers to the target branch
    ///
    /// Built-in profiles always pull a branch; custom steps only when a
    /// token uses `{{ branch }}`.
    pub fn uses_branch(&self) -> bool {
        match &self.steps {
            None => true,
            Some(steps) => steps
                .iter()
                .flat_map(|step| &step.run)
                .any(|token| placeholders(token).iter().any(|name| name == "branch")),
        }
    }

    /// URL the health probe requests
    pub fn health_check_url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.health_check.host, self.port, self.health_check.path
        )
    }
}

/// Reject names that could be mistaken for options or split by the tools
fn validate_ref_name(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        anyhow::bail!("{} must not be empty", field);
    }
    if value.starts_with('-') {
        anyhow::bail!("{} must not start with '-': {}", field, value);
    }
    if value.chars().any(char::is_whitespace) {
        anyhow::bail!("{} must not contain whitespace: {:?}", field, value);
    }
    Ok(())
}
