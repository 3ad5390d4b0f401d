//! CLI command definitions

use crate::core::{DeployConfig, Pipeline, Profile};
use crate::execution::{runner, CommandRunner};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Options shared by every command that builds a pipeline
#[derive(Debug, Args, Clone)]
pub struct DeployArgs {
    /// Path to a deployment YAML file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Supervisor app name (overrides the file)
    #[arg(long)]
    pub app: Option<String>,

    /// Port the app listens on (overrides the file)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Branch to pull; defaults to the current branch
    #[arg(short, long)]
    pub branch: Option<String>,

    /// Step sequence to run
    #[arg(long, value_enum, default_value_t = ProfileArg::Full)]
    pub profile: ProfileArg,

    /// Seconds to wait for the app to settle before probing it
    #[arg(long)]
    pub settle: Option<u64>,
}

impl DeployArgs {
    /// Merge the config file (if any) with command-line overrides and validate
    pub fn load_config(&self) -> Result<DeployConfig> {
        let mut config = match &self.config {
            Some(path) => DeployConfig::parse_file(path)?,
            None => DeployConfig::new(String::new(), 0),
        };

        if let Some(app) = &self.app {
            config.app_name = app.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(branch) = &self.branch {
            config.branch = Some(branch.clone());
        }
        if let Some(settle) = self.settle {
            config.settle_delay_secs = settle;
        }

        config
            .validate()
            .context("Invalid deployment configuration (pass --config or --app/--port)")?;
        Ok(config)
    }

    /// Load the configuration, resolve the branch if the steps need one, and build the pipeline
    pub async fn prepare<R: CommandRunner + ?Sized>(
        &self,
        runner: &R,
    ) -> Result<(DeployConfig, Pipeline)> {
        let mut config = self.load_config()?;

        if config.branch.is_none() && config.uses_branch() {
            config.branch = resolve_current_branch(&config, runner).await;
        }

        let pipeline =
            Pipeline::from_config(&config, self.profile.into()).context("Failed to build pipeline")?;
        Ok((config, pipeline))
    }
}

/// Ask git for the checked-out branch; `None` leaves `git pull` to its upstream
pub async fn resolve_current_branch<R: CommandRunner + ?Sized>(
    config: &DeployConfig,
    runner: &R,
) -> Option<String> {
    let command = vec![
        config.tools.git.clone(),
        "branch".to_string(),
        "--show-current".to_string(),
    ];

    match runner::query(runner, &command).await {
        Ok(Some(branch)) => {
            debug!("Resolved current branch: {}", branch);
            Some(branch)
        }
        Ok(None) => {
            warn!("Could not determine the current branch (detached HEAD?); pulling the upstream");
            None
        }
        Err(e) => {
            warn!("Could not determine the current branch: {}", e);
            None
        }
    }
}

/// Run the deployment pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub deploy: DeployArgs,
}

/// Print the resolved pipeline
///
/// No step runs. When no branch is configured the current one is still read
/// with `git branch --show-current`, as `run` would.
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub deploy: DeployArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Profile argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProfileArg {
    Full,
    Light,
    Restart,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Full => Profile::Full,
            ProfileArg::Light => Profile::Light,
            ProfileArg::Restart => Profile::Restart,
        }
    }
}
