//! Run controller: drives a workflow from PENDING to a terminal state.
//!
//! Steps run one at a time in ascending `order`. A passing step's output
//! replaces the run context; the first step that exhausts its retries fails
//! the run and every step after it is recorded as SKIPPED. Every failure,
//! including a panic escaping the engine, is folded into the returned
//! `WorkflowRun`; nothing is raised to the caller.

use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use serde_json::json;
use stepwise_types::error::RunStateError;
use stepwise_types::event::{EventKind, ExecutionEvent, OUTPUT_PREVIEW_CHARS, preview};
use stepwise_types::run::{RunStatus, StepRun, WorkflowRun};
use stepwise_types::workflow::Workflow;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::definition::{WorkflowError, check_runnable};
use super::executor::StepExecutor;
use crate::event::{EventSink, emit_guarded, payload};

/// Failure reason recorded when a run is cancelled.
pub const CANCELLED_REASON: &str = "Run cancelled";

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Internal engine faults. These never leave the controller; they are
/// reported as "Unexpected error: ..." on the run.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    State(#[from] RunStateError),
}

// ---------------------------------------------------------------------------
// RunController
// ---------------------------------------------------------------------------

/// Owns the state machine of each run it drives.
#[derive(Debug)]
pub struct RunController {
    executor: StepExecutor,
}

impl RunController {
    pub fn new(executor: StepExecutor) -> Self {
        Self { executor }
    }

    /// Execute `workflow` starting from `initial_context`.
    pub async fn run(&self, workflow: &Workflow, initial_context: &str) -> WorkflowRun {
        self.run_with_cancel(workflow, initial_context, &CancellationToken::new())
            .await
    }

    /// Execute `workflow`, checking `cancel` between attempts and steps.
    ///
    /// The returned run is always terminal: COMPLETED or FAILED.
    pub async fn run_with_cancel(
        &self,
        workflow: &Workflow,
        initial_context: &str,
        cancel: &CancellationToken,
    ) -> WorkflowRun {
        let mut run = WorkflowRun::new(workflow.id, initial_context);

        let result = AssertUnwindSafe(self.drive(workflow, &mut run, cancel))
            .catch_unwind()
            .await;

        let reason = match result {
            Ok(Ok(())) => return run,
            Ok(Err(e)) => format!("Unexpected error: {e}"),
            Err(panic) => format!("Unexpected error: {}", crate::panic_message(panic.as_ref())),
        };
        self.fold_unexpected(workflow, &mut run, reason);
        run
    }

    /// A FAILED run for a caller that could not set up execution, such as
    /// when the model client cannot be constructed.
    ///
    /// Emits `run_failed` with the setup diagnostic.
    pub fn setup_failure(
        workflow: &Workflow,
        initial_context: &str,
        reason: impl Into<String>,
        sink: &dyn EventSink,
    ) -> WorkflowRun {
        let mut run = WorkflowRun::new(workflow.id, initial_context);
        let reason = reason.into();
        if let Err(e) = run.transition(RunStatus::Failed) {
            tracing::error!(run_id = %run.id, error = %e, "cannot mark setup failure");
        }
        tracing::warn!(run_id = %run.id, workflow = %workflow.name, %reason, "run setup failed");
        run.failure_reason = Some(reason.clone());
        emit_guarded(
            sink,
            ExecutionEvent::run(
                EventKind::RunFailed,
                run.id,
                payload(json!({ "reason": reason, "total_cost_usd": 0.0 })),
            ),
        );
        run
    }

    fn emit(&self, event: ExecutionEvent) {
        emit_guarded(self.executor.sink(), event);
    }

    async fn drive(
        &self,
        workflow: &Workflow,
        run: &mut WorkflowRun,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if let Err(e) = check_runnable(workflow) {
            let detail = match e {
                WorkflowError::ValidationError(message) => message,
                other => other.to_string(),
            };
            run.failure_reason = Some(format!("Invalid workflow: {detail}"));
            run.transition(RunStatus::Failed)?;
            self.emit_run_failed(run);
            return Ok(());
        }

        run.transition(RunStatus::Running)?;
        tracing::info!(
            run_id = %run.id,
            workflow = %workflow.name,
            steps = workflow.steps.len(),
            "run started"
        );
        self.emit(ExecutionEvent::run(
            EventKind::RunStarted,
            run.id,
            payload(json!({
                "workflow_id": workflow.id,
                "workflow_name": workflow.name,
                "step_count": workflow.steps.len(),
            })),
        ));

        for step in workflow.ordered_steps() {
            if cancel.is_cancelled() {
                return self.finish_failed(workflow, run, CANCELLED_REASON.to_string());
            }

            run.current_step_order = step.order;
            let outcome = self.executor.execute(step, run.id, &run.context, cancel).await;

            let next_context = outcome.output().map(str::to_string);
            let failure = if outcome.cancelled {
                Some(CANCELLED_REASON.to_string())
            } else if outcome.passed {
                None
            } else {
                let diagnostic = outcome.error().unwrap_or("unknown error");
                Some(format!("Step '{}' failed: {diagnostic}", step.name))
            };

            for attempt in outcome.attempts {
                run.add_cost(attempt.cost_usd);
                run.record(attempt);
            }

            if let Some(reason) = failure {
                return self.finish_failed(workflow, run, reason);
            }
            if let Some(context) = next_context {
                run.context = context;
            }
        }

        run.final_output = Some(run.context.clone());
        run.transition(RunStatus::Completed)?;
        tracing::info!(
            run_id = %run.id,
            total_cost_usd = run.total_cost_usd,
            "run completed"
        );
        self.emit(ExecutionEvent::run(
            EventKind::RunCompleted,
            run.id,
            payload(json!({
                "total_cost_usd": run.total_cost_usd,
                "final_output": preview(&run.context, OUTPUT_PREVIEW_CHARS),
            })),
        ));
        Ok(())
    }

    fn finish_failed(
        &self,
        workflow: &Workflow,
        run: &mut WorkflowRun,
        reason: String,
    ) -> Result<(), EngineError> {
        skip_unattempted(workflow, run);
        tracing::warn!(run_id = %run.id, %reason, "run failed");
        run.failure_reason = Some(reason);
        run.transition(RunStatus::Failed)?;
        self.emit_run_failed(run);
        Ok(())
    }

    /// Record an engine fault on a run that may be in any state.
    fn fold_unexpected(&self, workflow: &Workflow, run: &mut WorkflowRun, reason: String) {
        tracing::error!(run_id = %run.id, %reason, "run aborted by engine fault");
        if run.status.is_terminal() {
            // The fault happened after the verdict was published; keep it.
            return;
        }
        if run.status == RunStatus::Running {
            skip_unattempted(workflow, run);
        }
        run.failure_reason = Some(reason);
        if let Err(e) = run.transition(RunStatus::Failed) {
            tracing::error!(run_id = %run.id, error = %e, "cannot mark run failed");
        }
        self.emit_run_failed(run);
    }

    fn emit_run_failed(&self, run: &WorkflowRun) {
        self.emit(ExecutionEvent::run(
            EventKind::RunFailed,
            run.id,
            payload(json!({
                "reason": run.failure_reason,
                "total_cost_usd": run.total_cost_usd,
            })),
        ));
    }
}

/// Give every step without a record an explicit SKIPPED entry, in
/// execution order.
fn skip_unattempted(workflow: &Workflow, run: &mut WorkflowRun) {
    for step in workflow.ordered_steps() {
        if !run.step_runs.contains_key(&step.id) {
            run.record(StepRun::skipped(step.id));
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
