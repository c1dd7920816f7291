//! Offline provider that answers without touching the network.
//!
//! Useful for dry runs (`stepwise run --stub`) and for tests that need
//! deterministic, non-zero token usage.

use stepwise_types::event::preview;
use stepwise_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use super::provider::LlmProvider;

/// Completion tokens reported for every stub reply.
const STUB_COMPLETION_TOKENS: u32 = 10;

/// Number of prompt characters echoed back in the reply.
const STUB_ECHO_CHARS: usize = 50;

/// Replies `"[STUB] Response to: <first 50 chars of prompt>..."`.
///
/// Prompt tokens are the whitespace-separated word count of the prompt.
#[derive(Debug, Default, Clone, Copy)]
pub struct StubProvider;

impl LlmProvider for StubProvider {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let content = format!(
            "[STUB] Response to: {}...",
            preview(&request.prompt, STUB_ECHO_CHARS)
        );
        let prompt_tokens = u32::try_from(request.prompt.split_whitespace().count()).unwrap_or(u32::MAX);

        Ok(CompletionResponse {
            content,
            usage: Usage {
                prompt_tokens,
                completion_tokens: STUB_COMPLETION_TOKENS,
            },
        })
    }
}
