//! Pure formatting functions for UI output.
//!
//! This module contains all display/formatting logic. The `plan_lines` and
//! `report_lines` helpers build plain text so they can be tested; the
//! `display_*` functions add styling and print.

use crate::boundary::BoundaryWarning;
use crate::pipeline::{PipelinePlan, PipelineReport, Stage, StageFailure};
use crate::version::ReleaseVersion;
use console::style;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a non-fatal warning.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// Print the banner that opens a pipeline stage.
pub fn display_stage(stage: Stage) {
    let rule = "=".repeat(43);
    println!("{}", style(&rule).dim());
    println!("{}", style(stage).bold());
    println!("{}", style(&rule).dim());
}

/// Print a failed run: the stage, what completed, and the cause.
pub fn display_failure(failure: &StageFailure) {
    display_error(&failure.error.to_string());
    let completed = failure
        .completed
        .map(|stage| stage.to_string())
        .unwrap_or_else(|| "nothing".to_string());
    eprintln!(
        "  failed in: {}\n  completed: {}",
        style(failure.stage).red(),
        completed
    );
}

/// Lines describing what a plan would do for `version`.
pub fn plan_lines(plan: &PipelinePlan, version: &ReleaseVersion) -> Vec<String> {
    let mut lines = vec![
        format!("Target:  {}", plan.target),
        format!("Version: {}", version),
    ];

    for field in &plan.version_fields {
        lines.push(format!(
            "Stamp {} = {} in {}",
            field.name,
            field.value,
            plan.project_dir.display()
        ));
    }

    for step in &plan.steps {
        lines.push(format!("Step:    {}", step));
    }

    if let Some(collect) = &plan.collect {
        lines.push(format!(
            "Collect: {} -> {} ({})",
            collect.output_dir.display(),
            collect.artifacts_dir.display(),
            collect.pattern.as_deref().unwrap_or("no pattern")
        ));
    }

    if let Some(package) = &plan.package {
        lines.push(format!(
            "Package: {} -> {}",
            package.source.display(),
            package.archive
        ));
    }

    match &plan.publish {
        Some(publish) => {
            let push = if publish.push { "and push " } else { "" };
            lines.push(format!(
                "Publish: tag {} {}to {}",
                version, push, publish.remote
            ));
            if publish.merge_back {
                lines.push(format!("Merge:   into {}", publish.trunk));
            }
        }
        None => lines.push("Publish: skipped".to_string()),
    }

    lines
}

/// Print the plan of a dry run.
pub fn display_plan(plan: &PipelinePlan, version: &ReleaseVersion) {
    println!("\n{}", style("Dry run, nothing was changed:").bold());
    for line in plan_lines(plan, version) {
        println!("  {}", line);
    }
}

/// Lines summarising a finished run.
pub fn report_lines(report: &PipelineReport) -> Vec<String> {
    let mut lines = vec![format!("Released {} as {}", report.target, report.version)];

    for path in &report.stamped {
        lines.push(format!("Stamped   {}", path.display()));
    }
    if report.commands_run > 0 {
        lines.push(format!("Ran       {} external command(s)", report.commands_run));
    }
    for path in &report.artifacts {
        lines.push(format!("Artifact  {}", path.display()));
    }
    if let Some(package) = &report.package {
        lines.push(format!(
            "Package   {} ({} file(s))",
            package.archive.display(),
            package.entries.len()
        ));
    }
    if let Some(tag) = &report.tag {
        lines.push(format!("Tag       {}", tag));
    }
    if let Some(merge) = &report.merge {
        lines.push(format!("Merge     {}", merge));
    }

    lines
}

/// Print the summary of a finished run, warnings first.
pub fn display_report(report: &PipelineReport) {
    for warning in &report.warnings {
        display_boundary_warning(warning);
    }

    let mut lines = report_lines(report).into_iter();
    if let Some(headline) = lines.next() {
        display_success(&headline);
    }
    for line in lines {
        println!("  {}", line);
    }
}

/// Display manual push instruction for a tag.
///
/// Shows the git command needed to push the tag to a remote.
pub fn display_manual_push_instruction(tag: &str, remote: &str) {
    println!(
        "\n{} To push this tag later, run:\n  {}",
        style("→").yellow(),
        style(format!("git push {} {}", remote, tag)).cyan()
    );
}
