//! Workflow document commands: `validate`, `export` and `import`.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use console::style;

use stepwise_core::workflow::definition::{export_workflow_json, import_workflow};
use stepwise_types::workflow::Workflow;

use super::Output;
use super::run::load_workflow;

/// Handle `stepwise validate`.
pub fn validate_file(path: &Path, output: Output) -> Result<ExitCode> {
    let workflow = load_workflow(path)?;

    if output.json {
        let out = serde_json::json!({
            "id": workflow.id.to_string(),
            "name": workflow.name,
            "steps": workflow.steps.len(),
            "valid": true,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if !output.quiet {
        println!("{}", render_outline(&workflow));
    }
    Ok(ExitCode::SUCCESS)
}

/// Handle `stepwise export`.
pub fn export_file(path: &Path) -> Result<ExitCode> {
    let workflow = load_workflow(path)?;
    println!("{}", export_workflow_json(&workflow)?);
    Ok(ExitCode::SUCCESS)
}

/// Handle `stepwise import`.
pub async fn import_file(path: &Path) -> Result<ExitCode> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: serde_json::Value =
        serde_json::from_str(&content).context("Import expects an exported JSON workflow")?;
    let workflow = import_workflow(document).context("Failed to import workflow")?;
    println!("{}", export_workflow_json(&workflow)?);
    Ok(ExitCode::SUCCESS)
}

/// Styled listing of a workflow's steps in execution order.
pub fn render_outline(workflow: &Workflow) -> String {
    let mut lines = vec![
        String::new(),
        format!(
            "  {} Workflow '{}' is valid",
            style("✓").green().bold(),
            style(&workflow.name).cyan()
        ),
        format!("  ID: {}", workflow.id),
    ];
    if let Some(description) = &workflow.description {
        lines.push(format!("  {}", style(description).dim()));
    }
    for step in workflow.ordered_steps() {
        let rules: Vec<&str> = step.validations.iter().map(|r| r.kind()).collect();
        lines.push(format!(
            "    {:>3}  {}  [{}] retries={} checks={}",
            step.order,
            step.name,
            step.model,
            step.max_retries,
            if rules.is_empty() {
                "-".to_string()
            } else {
                rules.join(",")
            }
        ));
    }
    lines.push(String::new());
    lines.join("\n")
}
