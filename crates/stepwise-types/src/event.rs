//! Execution events emitted while a workflow run progresses.
//!
//! `ExecutionEvent` is a flat, immutable record: a kind tag, the run and
//! (optionally) step it concerns, the attempt number, a timestamp and a
//! free-form payload. All values are Clone + Send + Sync so they can travel
//! through tokio channels.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Maximum number of characters of model output carried in event payloads.
pub const OUTPUT_PREVIEW_CHARS: usize = 500;

/// The closed set of event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    RunStarted,
    StepStarted,
    /// Reserved for token streaming; never emitted.
    LlmChunk,
    LlmOutput,
    ValidationPassed,
    ValidationFailed,
    StepCompleted,
    StepFailed,
    RunCompleted,
    RunFailed,
}

impl EventKind {
    /// Whether this kind ends a run's event stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::RunCompleted | EventKind::RunFailed)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::RunStarted => "run_started",
            EventKind::StepStarted => "step_started",
            EventKind::LlmChunk => "llm_chunk",
            EventKind::LlmOutput => "llm_output",
            EventKind::ValidationPassed => "validation_passed",
            EventKind::ValidationFailed => "validation_failed",
            EventKind::StepCompleted => "step_completed",
            EventKind::StepFailed => "step_failed",
            EventKind::RunCompleted => "run_completed",
            EventKind::RunFailed => "run_failed",
        };
        f.write_str(s)
    }
}

/// One notification of a run state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionEvent {
    #[serde(rename = "event")]
    pub kind: EventKind,
    pub run_id: Uuid,
    #[serde(default)]
    pub step_id: Option<Uuid>,
    /// Attempt number; run-level events carry 1.
    pub attempt: u32,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl ExecutionEvent {
    /// A run-level event.
    pub fn run(kind: EventKind, run_id: Uuid, payload: Map<String, Value>) -> Self {
        Self {
            kind,
            run_id,
            step_id: None,
            attempt: 1,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// A step-level event for a specific attempt.
    pub fn step(
        kind: EventKind,
        run_id: Uuid,
        step_id: Uuid,
        attempt: u32,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            kind,
            run_id,
            step_id: Some(step_id),
            attempt,
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Look up a string payload field.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Truncate `text` to at most `max_chars` characters on a char boundary.
pub fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
