//! CLI output formatting

use crate::{
    core::{Criticality, ExecutionStatus, Pipeline, PipelineOutcome, StepState},
    execution::{ExecutionEvent, RunReport},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Spinner shown while waiting out a step's post-delay
pub fn create_settle_spinner(step_name: &str, delay: Duration) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}") {
        spinner.set_style(template);
    }
    spinner.set_message(format!(
        "Waiting {}s after {} for things to settle...",
        delay.as_secs_f32(),
        step_name
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Horizontal rule spanning the terminal width
pub fn separator() -> String {
    let width = term_size::dimensions_stdout().map(|(w, _)| w).unwrap_or(80);
    "─".repeat(width)
}

/// Format a criticality tag for display
pub fn format_criticality(criticality: Criticality) -> String {
    match criticality {
        Criticality::Blocking => style("blocking").bold().to_string(),
        Criticality::Advisory => style("advisory").dim().to_string(),
    }
}

/// Format a step state for display
pub fn format_step_state(state: &StepState) -> String {
    match state {
        StepState::Pending => style("PENDING").dim().to_string(),
        StepState::Running { .. } => style("RUNNING").yellow().to_string(),
        StepState::Succeeded { .. } => style("OK").green().to_string(),
        StepState::Failed {
            exit_code,
            criticality: Criticality::Advisory,
            ..
        } => style(format!("WARN (exit {})", exit_code)).yellow().to_string(),
        StepState::Failed { exit_code, .. } => {
            style(format!("FAILED (exit {})", exit_code)).red().to_string()
        }
        StepState::Skipped { .. } => style("SKIPPED").dim().to_string(),
    }
}

/// Format an execution status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Pending => style("PENDING").dim().to_string(),
        ExecutionStatus::Running => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format an execution event for display
///
/// Returns `None` for events the spinner handles on its own.
pub fn format_execution_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event {
        ExecutionEvent::PipelineStarted {
            execution_id,
            pipeline_name,
            total_steps,
        } => format!(
            "{} Deploying {} ({} steps, run {})",
            ROCKET,
            style(pipeline_name).bold(),
            total_steps,
            style(&execution_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted {
            index,
            total,
            description,
            command_line,
            ..
        } => format!(
            "\n{} [{}/{}] {} {}",
            SPINNER,
            style(index).cyan(),
            style(total).dim(),
            style(description).bold(),
            style(format!("$ {}", command_line)).dim()
        ),
        ExecutionEvent::StepSucceeded { step_name, output } => match output {
            Some(output) if !output.trim().is_empty() => format!(
                "{}\n{} {}",
                format_output(output, 10),
                CHECK,
                style(step_name).green()
            ),
            _ => format!("{} {}", CHECK, style(step_name).green()),
        },
        ExecutionEvent::StepFailed {
            step_name,
            command_line,
            exit_code,
            criticality: Criticality::Advisory,
            output,
            stderr,
        } => {
            let mut line = format!(
                "{} {} exited with code {} (advisory, continuing): {}",
                WARN,
                style(step_name).yellow(),
                exit_code,
                style(command_line).dim()
            );
            append_captured(&mut line, output.as_deref(), stderr.as_deref());
            line
        }
        ExecutionEvent::StepFailed {
            step_name,
            command_line,
            exit_code,
            output,
            stderr,
            ..
        } => {
            let mut line = format!(
                "{} {} failed\n    command: {}\n    exit code: {}",
                CROSS,
                style(step_name).red().bold(),
                command_line,
                style(exit_code).red()
            );
            append_captured(&mut line, output.as_deref(), stderr.as_deref());
            line
        }
        ExecutionEvent::Settling { .. } | ExecutionEvent::Settled { .. } => return None,
        ExecutionEvent::StepsSkipped { step_names } => format!(
            "{} Not run: {}",
            INFO,
            style(step_names.join(", ")).dim()
        ),
        ExecutionEvent::PipelineCompleted { execution_id, outcome } => {
            let status = match outcome {
                PipelineOutcome::Success => format!("{} completed", style("successfully").green()),
                PipelineOutcome::FailedAt { step, exit_code } => format!(
                    "{} at {} (exit {})",
                    style("failed").red(),
                    style(step).bold(),
                    exit_code
                ),
            };
            format!(
                "\n{} Pipeline ({}) {}",
                INFO,
                style(&execution_id.to_string()[..8]).dim(),
                status
            )
        }
    };
    Some(line)
}

/// Append whatever a failed step printed, stdout first
fn append_captured(line: &mut String, stdout: Option<&str>, stderr: Option<&str>) {
    for captured in [stdout, stderr].into_iter().flatten() {
        if !captured.trim().is_empty() {
            line.push('\n');
            line.push_str(&format_output(captured.trim_end(), 10));
        }
    }
}

/// Final banner printed once a run is over
pub fn format_final_banner(report: &RunReport) -> String {
    match &report.outcome {
        PipelineOutcome::Success => {
            let mut banner = format!(
                "{} {} {}",
                CHECK,
                style(&report.pipeline_name).bold(),
                style("deployed successfully").green()
            );
            if !report.advisory_failures.is_empty() {
                let names: Vec<String> = report
                    .advisory_failures
                    .iter()
                    .map(|f| format!("{} (exit {})", f.step(), f.exit_code()))
                    .collect();
                banner.push_str(&format!(
                    "\n{} Advisory steps reported problems: {}",
                    WARN,
                    style(names.join(", ")).yellow()
                ));
            }
            banner
        }
        PipelineOutcome::FailedAt { step, exit_code } => {
            let rule = style("!".repeat(48)).red();
            format!(
                "{rule}\n{} {}\n{}\n{rule}",
                CROSS,
                style(format!(
                    "ERROR: step '{}' failed with exit code {}. Deployment stopped.",
                    step, exit_code
                ))
                .red()
                .bold(),
                style("Check the output above to see what went wrong; changes already applied were not rolled back.").red(),
            )
        }
    }
}

/// Format the step list of a pipeline for `plan`
pub fn format_plan(pipeline: &Pipeline) -> String {
    let mut lines = vec![format!(
        "{} {} ({} steps)",
        INFO,
        style(&pipeline.name).bold(),
        pipeline.len()
    )];

    for (index, step) in pipeline.steps.iter().enumerate() {
        lines.push(format!(
            "  {:>2}. {:<24} [{}] {}",
            index + 1,
            style(&step.name).cyan(),
            format_criticality(step.criticality),
            step.command_line()
        ));
        if !step.post_delay.is_zero() {
            lines.push(format!(
                "      {}",
                style(format!("then wait {}s", step.post_delay.as_secs_f32())).dim()
            ));
        }
    }

    lines.join("\n")
}

/// Format the per-step summary table of a finished run
pub fn format_run_summary(report: &RunReport) -> String {
    let mut lines: Vec<String> = report
        .steps
        .iter()
        .map(|record| format!("  {:<24} {}", record.name, format_step_state(&record.state)))
        .collect();
    lines.push(format!(
        "  {} of {} steps ran ({:.0}%)",
        report.state.completed_steps + report.state.failed_steps,
        report.state.total_steps,
        report.state.progress() * 100.0
    ));
    lines.join("\n")
}

/// Format captured output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
