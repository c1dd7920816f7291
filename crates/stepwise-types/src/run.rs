//! Execution state for workflow runs.
//!
//! A `WorkflowRun` is the mutable record of one execution of a `Workflow`.
//! It owns one `StepRun` per attempt; the step-id keyed map holds only the
//! latest attempt for each step while `attempt_log` keeps every attempt in
//! execution order.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RunStateError;

// ---------------------------------------------------------------------------
// Status enums
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
///
/// Transitions are monotone: `Pending -> Running -> {Completed | Failed}`,
/// plus `Pending -> Failed` when setup fails before any step runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Failed)
    }

    /// Whether moving from `self` to `next` keeps the status monotone.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (RunStatus::Pending, RunStatus::Running)
                | (RunStatus::Pending, RunStatus::Failed)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Failed)
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Status of a single step attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed,
    /// The run aborted before this step was attempted.
    Skipped,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "pending"),
            StepStatus::Running => write!(f, "running"),
            StepStatus::Passed => write!(f, "passed"),
            StepStatus::Failed => write!(f, "failed"),
            StepStatus::Skipped => write!(f, "skipped"),
        }
    }
}

// ---------------------------------------------------------------------------
// StepRun
// ---------------------------------------------------------------------------

/// Record of one attempt at one step.
///
/// Every retry produces a fresh `StepRun`; earlier attempts are never
/// rewritten. Skipped steps get a record with `attempt == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRun {
    pub id: Uuid,
    pub step_id: Uuid,
    /// 1-indexed attempt number; 0 for skipped steps.
    pub attempt: u32,
    pub status: StepStatus,
    /// Context the prompt was built from.
    pub input_context: Option<String>,
    /// Raw model output, when the call succeeded.
    pub output: Option<String>,
    /// Diagnostic for a failed attempt.
    pub error: Option<String>,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub cost_usd: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl StepRun {
    /// A new attempt that has just started running.
    pub fn started(step_id: Uuid, attempt: u32, input_context: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            step_id,
            attempt,
            status: StepStatus::Running,
            input_context: Some(input_context.to_string()),
            output: None,
            error: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_usd: 0.0,
            started_at: Some(Utc::now()),
            finished_at: None,
        }
    }

    /// Placeholder record for a step that was never attempted.
    pub fn skipped(step_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            step_id,
            attempt: 0,
            status: StepStatus::Skipped,
            input_context: None,
            output: None,
            error: None,
            prompt_tokens: 0,
            completion_tokens: 0,
            cost_usd: 0.0,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn mark_passed(&mut self) {
        self.status = StepStatus::Passed;
        self.finished_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = StepStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }
}

// ---------------------------------------------------------------------------
// WorkflowRun
// ---------------------------------------------------------------------------

/// One execution instance of a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: RunStatus,
    /// `order` of the step currently (or last) executing.
    pub current_step_order: i64,
    /// Latest attempt per step id.
    pub step_runs: HashMap<Uuid, StepRun>,
    /// Every attempt in execution order, including skipped placeholders.
    #[serde(default)]
    pub attempt_log: Vec<StepRun>,
    /// Context handed to the next step.
    pub context: String,
    pub final_output: Option<String>,
    pub failure_reason: Option<String>,
    pub total_cost_usd: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowRun {
    /// A pending run seeded with the caller's initial context.
    pub fn new(workflow_id: Uuid, initial_context: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            workflow_id,
            status: RunStatus::Pending,
            current_step_order: 0,
            step_runs: HashMap::new(),
            attempt_log: Vec::new(),
            context: initial_context.into(),
            final_output: None,
            failure_reason: None,
            total_cost_usd: 0.0,
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to `next`, stamping start/finish times.
    ///
    /// Rejects any transition that would move the status backward or out of
    /// a terminal state.
    pub fn transition(&mut self, next: RunStatus) -> Result<(), RunStateError> {
        if !self.status.can_transition_to(next) {
            return Err(RunStateError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        match next {
            RunStatus::Running => self.started_at = Some(Utc::now()),
            RunStatus::Completed | RunStatus::Failed => self.finished_at = Some(Utc::now()),
            RunStatus::Pending => {}
        }
        Ok(())
    }

    /// Append an attempt to the log and make it the latest for its step.
    pub fn record(&mut self, step_run: StepRun) {
        self.attempt_log.push(step_run.clone());
        self.step_runs.insert(step_run.step_id, step_run);
    }

    /// Add an attempt's cost to the run total.
    pub fn add_cost(&mut self, cost_usd: f64) {
        if cost_usd.is_finite() && cost_usd > 0.0 {
            self.total_cost_usd += cost_usd;
        }
    }

    /// Latest recorded attempt for a step.
    pub fn latest(&self, step_id: &Uuid) -> Option<&StepRun> {
        self.step_runs.get(step_id)
    }

    /// A specific attempt for a step, looked up by (step id, attempt).
    pub fn attempt(&self, step_id: &Uuid, attempt: u32) -> Option<&StepRun> {
        self.attempt_log
            .iter()
            .find(|r| &r.step_id == step_id && r.attempt == attempt)
    }

    /// All attempts for a step, oldest first.
    pub fn attempts_for<'a>(&'a self, step_id: &'a Uuid) -> impl Iterator<Item = &'a StepRun> + 'a {
        self.attempt_log.iter().filter(move |r| &r.step_id == step_id)
    }
}
