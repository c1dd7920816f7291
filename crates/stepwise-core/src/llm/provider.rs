//! LlmProvider trait definition.
//!
//! This is the model-call capability the engine consumes. Uses RPITIT for
//! `complete`; see [`super::box_provider`] for the object-safe wrapper.

use stepwise_types::llm::{CompletionRequest, CompletionResponse, LlmError};

/// Trait for model-call backends (Unbound gateway, offline stub, test doubles).
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). One call is
/// one non-streaming round trip; timeouts and transport retries are the
/// implementation's concern.
///
/// Implementations live in stepwise-infra (e.g., `UnboundProvider`) and in
/// [`super::stub`].
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "unbound", "stub").
    fn name(&self) -> &str;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
