//! Secondary-model judgement of an output against free-text criteria.

use stepwise_types::event::preview;
use stepwise_types::llm::CompletionRequest;
use stepwise_types::workflow::ModelName;

use super::ValidationOutcome;
use crate::llm::box_provider::BoxLlmProvider;

/// Model used for every judgement, independent of the step's model.
pub const JUDGE_MODEL: ModelName = ModelName::KimiK2Instruct;

const JUDGE_SYSTEM_PROMPT: &str =
    "You are a validation judge. You MUST respond with exactly YES or NO, nothing else.";

/// Characters of an unparseable verdict quoted back in the diagnostic.
const UNCLEAR_PREVIEW_CHARS: usize = 50;

fn judge_prompt(criteria: &str, output: &str) -> String {
    format!(
        "You are a strict validator. Evaluate if the following output meets the given criteria.\n\n\
         CRITERIA: {criteria}\n\n\
         OUTPUT TO EVALUATE:\n{output}\n\n\
         Does this output meet the criteria? \n\
         Respond with ONLY \"YES\" or \"NO\". Do not explain."
    )
}

/// Ask the judge model whether `output` satisfies `criteria`.
///
/// The verdict is read from the trimmed, uppercased reply: a `YES` prefix
/// passes, a `NO` prefix fails, anything else is an unclear verdict. Token
/// usage of the judge call is not billed to the run.
pub async fn validate_llm_judge(
    output: &str,
    criteria: Option<&str>,
    provider: Option<&BoxLlmProvider>,
) -> ValidationOutcome {
    let Some(criteria) = criteria else {
        return ValidationOutcome::fail("ValidationRule.criteria is required for LLM_JUDGE validation");
    };
    let Some(provider) = provider else {
        return ValidationOutcome::fail("LLM client is required for LLM_JUDGE validation");
    };

    let request = CompletionRequest::new(JUDGE_MODEL, judge_prompt(criteria, output))
        .with_system(Some(JUDGE_SYSTEM_PROMPT.to_string()))
        .with_temperature(0.0);

    let reply = match provider.complete(&request).await {
        Ok(response) => response.content,
        Err(e) => {
            tracing::warn!(provider = provider.name(), error = %e, "judge call failed");
            return ValidationOutcome::fail(format!("LLM judge error: {e}"));
        }
    };

    let verdict = reply.trim().to_uppercase();
    if verdict.starts_with("YES") {
        ValidationOutcome::pass()
    } else if verdict.starts_with("NO") {
        ValidationOutcome::fail(format!("LLM judge rejected output. Criteria: {criteria}"))
    } else {
        ValidationOutcome::fail(format!(
            "LLM judge gave unclear response: '{}'. Expected YES or NO.",
            preview(reply.trim(), UNCLEAR_PREVIEW_CHARS)
        ))
    }
}
