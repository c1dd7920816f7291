//! Type-erased provider handle shared by the executor and the judge.
//!
//! `LlmProvider` uses RPITIT and so cannot be a trait object. `ErasedProvider`
//! is its boxed-future twin, implemented for every `LlmProvider`, and
//! `BoxLlmProvider` owns one behind a `Box`.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures_util::FutureExt;

use stepwise_types::llm::{CompletionRequest, CompletionResponse, LlmError};

use super::provider::LlmProvider;

type CompletionFuture<'a> = Pin<Box<dyn Future<Output = Result<CompletionResponse, LlmError>> + Send + 'a>>;

/// Object-safe mirror of [`LlmProvider`].
pub trait ErasedProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a>;
}

impl<T: LlmProvider> ErasedProvider for T {
    fn provider_name(&self) -> &str {
        self.name()
    }

    fn complete_erased<'a>(&'a self, request: &'a CompletionRequest) -> CompletionFuture<'a> {
        Box::pin(self.complete(request))
    }
}

/// A model client chosen at runtime (Unbound, stub, or a test double).
pub struct BoxLlmProvider {
    inner: Box<dyn ErasedProvider>,
}

impl BoxLlmProvider {
    pub fn new<T: LlmProvider + 'static>(provider: T) -> Self {
        Self {
            inner: Box::new(provider),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.provider_name()
    }

    /// Run one completion.
    ///
    /// A panic inside the provider comes back as [`LlmError::Provider`], so
    /// a broken client costs the caller one attempt and nothing more.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let call = AssertUnwindSafe(self.inner.complete_erased(request)).catch_unwind();
        match call.await {
            Ok(result) => result,
            Err(panic) => {
                let message = crate::panic_message(panic.as_ref());
                tracing::error!(provider = self.name(), %message, "provider panicked");
                Err(LlmError::Provider {
                    message: format!("provider panicked: {message}"),
                })
            }
        }
    }
}

impl std::fmt::Debug for BoxLlmProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxLlmProvider")
            .field("name", &self.name())
            .finish()
    }
}
