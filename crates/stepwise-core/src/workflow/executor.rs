//! Step executor: one step, bounded retries, strictly sequential attempts.
//!
//! Each attempt renders the prompt from the context the step was entered
//! with, calls the model once, and applies the step's validation rules in
//! order. A call failure or a failed validation consumes the attempt; the
//! executor never raises. Retries re-send the identical prompt.

use std::sync::Arc;

use serde_json::json;
use stepwise_types::event::{EventKind, ExecutionEvent, OUTPUT_PREVIEW_CHARS, preview};
use stepwise_types::llm::{CompletionRequest, DEFAULT_TEMPERATURE};
use stepwise_types::run::{StepRun, StepStatus};
use stepwise_types::workflow::Step;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::pricing::RateTable;
use crate::event::{EventSink, emit_guarded, payload};
use crate::llm::box_provider::BoxLlmProvider;
use crate::validation::ValidationDispatcher;

// ---------------------------------------------------------------------------
// StepOutcome
// ---------------------------------------------------------------------------

/// Result of driving one step to a verdict.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Every attempt made, oldest first.
    pub attempts: Vec<StepRun>,
    /// Whether the last attempt passed all validations.
    pub passed: bool,
    /// Set when the step was interrupted before exhausting its budget.
    pub cancelled: bool,
}

impl StepOutcome {
    /// The final attempt, if any was made.
    pub fn latest(&self) -> Option<&StepRun> {
        self.attempts.last()
    }

    /// Output of the passing attempt; this becomes the next context.
    pub fn output(&self) -> Option<&str> {
        if self.passed {
            self.latest().and_then(|r| r.output.as_deref())
        } else {
            None
        }
    }

    /// Diagnostic of the last failed attempt.
    pub fn error(&self) -> Option<&str> {
        self.latest().and_then(|r| r.error.as_deref())
    }

    /// Sum of the cost of every attempt.
    pub fn total_cost(&self) -> f64 {
        self.attempts.iter().map(|r| r.cost_usd).sum()
    }
}

// ---------------------------------------------------------------------------
// StepExecutor
// ---------------------------------------------------------------------------

/// Executes single steps against a model provider.
pub struct StepExecutor {
    provider: Arc<BoxLlmProvider>,
    dispatcher: ValidationDispatcher,
    sink: Arc<dyn EventSink>,
    rates: RateTable,
    temperature: f64,
    max_tokens: Option<u32>,
}

impl StepExecutor {
    pub fn new(provider: Arc<BoxLlmProvider>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            provider,
            dispatcher: ValidationDispatcher::new(),
            sink,
            rates: RateTable::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_rates(mut self, rates: RateTable) -> Self {
        self.rates = rates;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn sink(&self) -> &dyn EventSink {
        self.sink.as_ref()
    }

    fn emit(&self, event: ExecutionEvent) {
        emit_guarded(self.sink.as_ref(), event);
    }

    /// Run `step` with `context` until an attempt passes, the retry budget
    /// is spent, or `cancel` fires between attempts.
    ///
    /// Makes between 1 and `max_retries + 1` attempts unless cancelled
    /// before the first one.
    pub async fn execute(
        &self,
        step: &Step,
        run_id: Uuid,
        context: &str,
        cancel: &CancellationToken,
    ) -> StepOutcome {
        let max_attempts = step.max_attempts();
        let prompt = step.render_prompt(context);
        let mut attempts = Vec::with_capacity(max_attempts as usize);

        for attempt in 1..=max_attempts {
            if cancel.is_cancelled() {
                tracing::info!(%run_id, step = %step.name, attempt, "step cancelled");
                if !attempts.is_empty() {
                    let reason = format!("Cancelled after {} of {max_attempts} attempts", attempt - 1);
                    self.emit(ExecutionEvent::step(
                        EventKind::StepFailed,
                        run_id,
                        step.id,
                        attempt - 1,
                        payload(json!({ "step_name": step.name, "reason": reason })),
                    ));
                }
                return StepOutcome {
                    attempts,
                    passed: false,
                    cancelled: true,
                };
            }

            let record = self.attempt(step, run_id, attempt, context, &prompt).await;
            let passed = record.status == StepStatus::Passed;
            attempts.push(record);

            if passed {
                return StepOutcome {
                    attempts,
                    passed: true,
                    cancelled: false,
                };
            }
        }

        tracing::warn!(%run_id, step = %step.name, max_attempts, "step exhausted its attempts");
        self.emit(ExecutionEvent::step(
            EventKind::StepFailed,
            run_id,
            step.id,
            max_attempts,
            payload(json!({
                "step_name": step.name,
                "reason": format!("All {max_attempts} attempts failed"),
            })),
        ));

        StepOutcome {
            attempts,
            passed: false,
            cancelled: false,
        }
    }

    /// One call-and-validate cycle.
    async fn attempt(
        &self,
        step: &Step,
        run_id: Uuid,
        attempt: u32,
        context: &str,
        prompt: &str,
    ) -> StepRun {
        let mut record = StepRun::started(step.id, attempt, context);
        self.emit(ExecutionEvent::step(
            EventKind::StepStarted,
            run_id,
            step.id,
            attempt,
            payload(json!({
                "step_name": step.name,
                "max_attempts": step.max_attempts(),
            })),
        ));
        tracing::debug!(%run_id, step_id = %step.id, attempt, model = %step.model, "calling model");

        let request = CompletionRequest::new(step.model, prompt)
            .with_system(step.system_prompt.clone())
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let response = match self.provider.complete(&request).await {
            Ok(response) => response,
            Err(e) => {
                let reason = format!("LLM call failed: {e}");
                tracing::warn!(%run_id, step_id = %step.id, attempt, error = %e, "model call failed");
                self.emit(ExecutionEvent::step(
                    EventKind::ValidationFailed,
                    run_id,
                    step.id,
                    attempt,
                    payload(json!({ "reason": reason })),
                ));
                record.mark_failed(reason);
                return record;
            }
        };

        record.prompt_tokens = response.usage.prompt_tokens;
        record.completion_tokens = response.usage.completion_tokens;
        record.cost_usd = self.rates.cost(step.model, response.usage);
        self.emit(ExecutionEvent::step(
            EventKind::LlmOutput,
            run_id,
            step.id,
            attempt,
            payload(json!({
                "output": preview(&response.content, OUTPUT_PREVIEW_CHARS),
                "prompt_tokens": record.prompt_tokens,
                "completion_tokens": record.completion_tokens,
            })),
        ));

        let outcome = self
            .dispatcher
            .validate_all(&response.content, &step.validations, Some(self.provider.as_ref()))
            .await;
        record.output = Some(response.content);

        if outcome.passed {
            record.mark_passed();
            tracing::info!(%run_id, step = %step.name, attempt, "step passed");
            self.emit(ExecutionEvent::step(
                EventKind::ValidationPassed,
                run_id,
                step.id,
                attempt,
                payload(json!({})),
            ));
            let output = record.output.as_deref().unwrap_or_default();
            self.emit(ExecutionEvent::step(
                EventKind::StepCompleted,
                run_id,
                step.id,
                attempt,
                payload(json!({
                    "step_name": step.name,
                    "output": preview(output, OUTPUT_PREVIEW_CHARS),
                })),
            ));
        } else {
            let reason = outcome
                .error
                .unwrap_or_else(|| "Validation failed".to_string());
            tracing::debug!(%run_id, step = %step.name, attempt, %reason, "attempt rejected");
            self.emit(ExecutionEvent::step(
                EventKind::ValidationFailed,
                run_id,
                step.id,
                attempt,
                payload(json!({ "reason": reason })),
            ));
            record.mark_failed(reason);
        }

        record
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor")
            .field("provider", &self.provider.name())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
