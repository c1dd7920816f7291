//! LLM request/response types for Stepwise.
//!
//! These types model the single non-streaming completion call the engine
//! makes per attempt, plus the error surface of provider implementations.

use serde::{Deserialize, Serialize};

use crate::workflow::ModelName;

/// Default sampling temperature for step calls.
pub const DEFAULT_TEMPERATURE: f64 = 0.2;

/// Request to an LLM provider for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub model: ModelName,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: ModelName, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: Option<String>) -> Self {
        self.system = system;
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
}

/// Token usage reported for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Full response from a completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: Usage,
}

/// Errors from LLM provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Request timed out after {secs}s (url={url})")]
    Timeout { secs: u64, url: String },

    #[error("Network error: {message} (url={url})")]
    Network { message: String, url: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("No choices in API response")]
    NoChoices,

    #[error("Failed to parse response: {0}")]
    Deserialization(String),

    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("invalid provider configuration: {0}")]
    Configuration(String),
}
