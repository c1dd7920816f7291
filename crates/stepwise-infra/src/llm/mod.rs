//! Model provider implementations.
//!
//! [`create_provider`] picks the concrete [`LlmProvider`] for a run: the
//! Unbound gateway client by default, or the offline stub.
//!
//! [`LlmProvider`]: stepwise_core::llm::provider::LlmProvider

pub mod unbound;

use stepwise_core::llm::box_provider::BoxLlmProvider;
use stepwise_core::llm::stub::StubProvider;
use stepwise_types::config::ProviderSettings;
use stepwise_types::llm::LlmError;

use self::unbound::UnboundProvider;

/// Which provider a run should talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Unbound,
    Stub,
}

/// Create a [`BoxLlmProvider`] from `[provider]` settings.
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] when the Unbound API key is missing
/// or the HTTP client cannot be built. The stub never fails.
pub fn create_provider(kind: ProviderKind, settings: &ProviderSettings) -> Result<BoxLlmProvider, LlmError> {
    match kind {
        ProviderKind::Stub => Ok(BoxLlmProvider::new(StubProvider)),
        ProviderKind::Unbound => {
            let provider = UnboundProvider::from_settings(settings, None)?;
            tracing::debug!(url = provider.url(), "using Unbound provider");
            Ok(BoxLlmProvider::new(provider))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_stub_provider() {
        let provider = create_provider(ProviderKind::Stub, &ProviderSettings::default()).unwrap();
        assert_eq!(provider.name(), "stub");
    }

    #[test]
    fn test_create_unbound_without_key_fails() {
        let settings = ProviderSettings {
            api_key_env: "STEPWISE_TEST_UNSET_KEY_VAR".to_string(),
            ..ProviderSettings::default()
        };
        let result = create_provider(ProviderKind::Unbound, &settings);
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }
}
