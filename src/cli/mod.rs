//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{PlanCommand, RunCommand};
use std::ffi::OsString;

/// Deploy a supervised web service: pull, install, reload, probe, reload proxy
#[derive(Debug, Parser, Clone)]
#[command(name = "redeploy")]
#[command(author = "redeploy contributors")]
#[command(version = "0.1.0")]
#[command(about = "A fail-fast deployment pipeline runner", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the deployment pipeline
    Run(RunCommand),

    /// Print the steps a run would execute, without executing them
    ///
    /// When no branch is configured, the current branch is read with
    /// `git branch --show-current` so the plan shows what `run` would pull.
    Plan(PlanCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}
