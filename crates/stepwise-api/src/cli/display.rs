//! Terminal rendering for live run events and finished runs.

use console::style;
use serde_json::Value;

use stepwise_core::workflow::pricing::format_cost;
use stepwise_types::event::{EventKind, ExecutionEvent};
use stepwise_types::run::{RunStatus, StepStatus, WorkflowRun};
use stepwise_types::workflow::Workflow;

fn payload_u64(event: &ExecutionEvent, key: &str) -> Option<u64> {
    event.payload.get(key).and_then(Value::as_u64)
}

/// One line for a live event, or `None` for events the summary covers.
pub fn render_event(event: &ExecutionEvent) -> Option<String> {
    let line = match event.kind {
        EventKind::RunStarted => format!(
            "  {} Running '{}' ({} steps)",
            style("▶").cyan().bold(),
            style(event.payload_str("workflow_name").unwrap_or("workflow")).cyan(),
            payload_u64(event, "step_count").unwrap_or(0)
        ),
        EventKind::StepStarted => format!(
            "  {} {} {}",
            style("→").bold(),
            event.payload_str("step_name").unwrap_or("step"),
            style(format!(
                "(attempt {}/{})",
                event.attempt,
                payload_u64(event, "max_attempts").unwrap_or(u64::from(event.attempt))
            ))
            .dim()
        ),
        EventKind::LlmOutput => format!(
            "    {}",
            style(format!(
                "{} prompt + {} completion tokens",
                payload_u64(event, "prompt_tokens").unwrap_or(0),
                payload_u64(event, "completion_tokens").unwrap_or(0)
            ))
            .dim()
        ),
        EventKind::ValidationPassed => format!("    {} validations passed", style("✓").green()),
        EventKind::ValidationFailed => format!(
            "    {} {}",
            style("✗").red(),
            event.payload_str("reason").unwrap_or("validation failed")
        ),
        EventKind::StepCompleted => format!(
            "  {} {} completed",
            style("✓").green().bold(),
            event.payload_str("step_name").unwrap_or("step")
        ),
        EventKind::StepFailed => format!(
            "  {} {}: {}",
            style("✗").red().bold(),
            event.payload_str("step_name").unwrap_or("step"),
            event.payload_str("reason").unwrap_or("failed")
        ),
        EventKind::LlmChunk | EventKind::RunCompleted | EventKind::RunFailed => return None,
    };
    Some(line)
}

/// Multi-line summary of a terminal run.
pub fn render_run_summary(workflow: &Workflow, run: &WorkflowRun) -> String {
    let mut lines = Vec::new();
    lines.push(String::new());
    let headline = match run.status {
        RunStatus::Completed => format!("  {} Run completed", style("✓").green().bold()),
        RunStatus::Failed => format!("  {} Run failed", style("✗").red().bold()),
        other => format!("  Run {other}"),
    };
    lines.push(headline);
    lines.push(format!("  Run ID: {}", run.id));
    lines.push(format!("  Cost: {}", format_cost(run.total_cost_usd)));

    if !workflow.steps.is_empty() {
        lines.push("  Steps:".to_string());
    }
    for step in workflow.ordered_steps() {
        let attempts = run.attempts_for(&step.id).filter(|r| r.attempt > 0).count();
        let status = run
            .latest(&step.id)
            .map_or(StepStatus::Pending, |r| r.status);
        let status = match status {
            StepStatus::Passed => style(status.to_string()).green(),
            StepStatus::Failed => style(status.to_string()).red(),
            _ => style(status.to_string()).dim(),
        };
        lines.push(format!(
            "    {:>3}  {}  {} ({} attempt{})",
            step.order,
            step.name,
            status,
            attempts,
            if attempts == 1 { "" } else { "s" }
        ));
    }

    if let Some(reason) = &run.failure_reason {
        lines.push(format!("  Reason: {}", style(reason).red()));
    }
    if let Some(output) = &run.final_output {
        lines.push(String::new());
        lines.push(format!("  {}", style("Output:").bold()));
        lines.push(output.clone());
    }
    lines.push(String::new());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_types::run::StepRun;
    use stepwise_types::workflow::{ModelName, Step};
    use uuid::Uuid;

    fn event(kind: EventKind, payload: Value) -> ExecutionEvent {
        let Value::Object(map) = payload else {
            panic!("payload must be an object");
        };
        ExecutionEvent::step(kind, Uuid::now_v7(), Uuid::now_v7(), 2, map)
    }

    #[test]
    fn step_started_shows_attempt_budget() {
        let line = render_event(&event(
            EventKind::StepStarted,
            json!({"step_name": "draft", "max_attempts": 3}),
        ))
        .unwrap();
        assert!(line.contains("draft"));
        assert!(line.contains("attempt 2/3"));
    }

    #[test]
    fn validation_failed_shows_reason() {
        let line = render_event(&event(
            EventKind::ValidationFailed,
            json!({"reason": "Output does not contain expected text: 'def'"}),
        ))
        .unwrap();
        assert!(line.contains("does not contain expected text"));
    }

    #[test]
    fn terminal_events_are_left_to_summary() {
        assert!(render_event(&event(EventKind::RunCompleted, json!({}))).is_none());
        assert!(render_event(&event(EventKind::RunFailed, json!({}))).is_none());
    }

    #[test]
    fn summary_lists_steps_and_reason() {
        let first = Step::new("draft", 1, ModelName::KimiK2Instruct, "{{context}}");
        let second = Step::new("review", 2, ModelName::KimiK2p5, "{{context}}");
        let workflow = Workflow::new("pipeline", vec![second.clone(), first.clone()]);

        let mut run = WorkflowRun::new(workflow.id, "seed");
        run.transition(RunStatus::Running).unwrap();
        for attempt in 1..=2 {
            let mut attempt_run = StepRun::started(first.id, attempt, "seed");
            attempt_run.mark_failed("no match");
            run.record(attempt_run);
        }
        run.record(StepRun::skipped(second.id));
        run.failure_reason = Some("Step 'draft' failed: no match".to_string());
        run.transition(RunStatus::Failed).unwrap();

        let summary = render_run_summary(&workflow, &run);
        assert!(summary.contains("Run failed"));
        assert!(summary.contains("(2 attempts)"));
        assert!(summary.contains("(0 attempts)"));
        assert!(summary.contains("Step 'draft' failed: no match"));
        assert!(summary.find("draft").unwrap() < summary.find("review").unwrap());
    }
}
