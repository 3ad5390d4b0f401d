use anyhow::{Context, Result};
use indicatif::ProgressBar;
use redeploy::cli::commands::{PlanCommand, RunCommand};
use redeploy::cli::output::*;
use redeploy::cli::{Cli, Command};
use redeploy::execution::{DeployEngine, ExecutionEvent, SystemCommandRunner};
use std::sync::{Arc, Mutex};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Plan(cmd) => plan_pipeline(cmd).await?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let runner = SystemCommandRunner::new();
    let (config, pipeline) = cmd.deploy.prepare(&runner).await?;

    println!(
        "{} Loaded pipeline: {}",
        INFO,
        style(&pipeline.name).bold()
    );
    match &config.branch {
        Some(branch) => println!(
            "{} Deploying branch \"{}\" from {}",
            INFO,
            style(branch).cyan(),
            style(&config.remote).dim()
        ),
        None => println!("{} Deploying the upstream of the current checkout", INFO),
    }

    let mut engine = DeployEngine::new(runner);

    // Set up event handler for console output
    let spinner: Arc<Mutex<Option<ProgressBar>>> = Arc::new(Mutex::new(None));
    engine.add_event_handler(move |event| {
        match &event {
            ExecutionEvent::Settling { step_name, delay } => {
                if let Ok(mut slot) = spinner.lock() {
                    *slot = Some(create_settle_spinner(step_name, *delay));
                }
            }
            ExecutionEvent::Settled { .. } => {
                if let Some(bar) = spinner.lock().ok().and_then(|mut slot| slot.take()) {
                    bar.finish_and_clear();
                }
            }
            _ => {}
        }

        if let Some(line) = format_execution_event(&event) {
            println!("{}", line);
        }
    });

    // Execute pipeline
    println!("{}", style(separator()).dim());
    let report = engine.run(&pipeline).await;
    println!("{}", style(separator()).dim());

    println!("{}", format_run_summary(&report));
    println!("  Status: {}", format_status(report.state.status));
    println!();
    println!("{}", format_final_banner(&report));

    if let Err(failure) = report.outcome.into_result() {
        error!("{}", failure);
        std::process::exit(1);
    }

    Ok(())
}

async fn plan_pipeline(cmd: &PlanCommand) -> Result<()> {
    let runner = SystemCommandRunner::new();
    let (config, pipeline) = cmd.deploy.prepare(&runner).await?;

    if cmd.json {
        let steps: Vec<_> = pipeline
            .steps
            .iter()
            .map(|step| {
                serde_json::json!({
                    "name": step.name,
                    "description": step.description,
                    "command": step.command,
                    "criticality": step.criticality,
                    "post_delay_secs": step.post_delay.as_secs_f64(),
                    "timeout_secs": step.timeout.map(|t| t.as_secs_f64()),
                    "capture_output": step.capture_output,
                })
            })
            .collect();
        let data = serde_json::json!({
            "name": pipeline.name,
            "app_name": config.app_name,
            "port": config.port,
            "branch": config.branch,
            "steps": steps,
        });
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        println!("{}", format_plan(&pipeline));
    }

    Ok(())
}
