//! UnboundProvider -- [`LlmProvider`] for the Unbound chat-completions gateway.
//!
//! Speaks the OpenAI-compatible `chat/completions` wire format over HTTPS
//! with bearer authentication. One non-streaming request per call.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use stepwise_core::llm::provider::LlmProvider;
use stepwise_types::config::ProviderSettings;
use stepwise_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'static str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ---------------------------------------------------------------------------
// UnboundProvider
// ---------------------------------------------------------------------------

/// Unbound gateway provider.
///
/// # API Key Security
///
/// The API key is stored as a [`SecretString`] and is only exposed when
/// building the `Authorization` header.
pub struct UnboundProvider {
    client: reqwest::Client,
    api_key: SecretString,
    url: String,
    timeout_secs: u64,
}

impl UnboundProvider {
    /// Create a provider posting to `url` with the given request timeout.
    pub fn new(api_key: SecretString, url: impl Into<String>, timeout_secs: u64) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            url: url.into(),
            timeout_secs,
        })
    }

    /// Build a provider from `[provider]` settings, reading the API key from
    /// the environment variable they name.
    ///
    /// An explicit `api_key` takes priority over the environment.
    pub fn from_settings(settings: &ProviderSettings, api_key: Option<SecretString>) -> Result<Self, LlmError> {
        let api_key = match api_key {
            Some(key) => key,
            None => std::env::var(&settings.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .map(SecretString::from)
                .ok_or_else(|| {
                    LlmError::Configuration(format!(
                        "Unbound API key not provided. Set {} environment variable or pass api_key parameter.",
                        settings.api_key_env
                    ))
                })?,
        };
        Self::new(api_key, settings.base_url.clone(), settings.timeout_secs)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn to_chat_request<'a>(request: &'a CompletionRequest) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });

        ChatRequest {
            model: request.model.as_str(),
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout {
                secs: self.timeout_secs,
                url: self.url.clone(),
            }
        } else {
            LlmError::Network {
                message: err.to_string(),
                url: self.url.clone(),
            }
        }
    }
}

/// Pull `error.message` out of an error body, falling back to the raw text.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

impl std::fmt::Debug for UnboundProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnboundProvider")
            .field("url", &self.url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl LlmProvider for UnboundProvider {
    fn name(&self) -> &str {
        "unbound"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = Self::to_chat_request(request);
        tracing::debug!(model = %request.model, url = %self.url, "sending completion request");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| LlmError::Deserialization(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::NoChoices)?
            .message
            .content
            .unwrap_or_default();

        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse { content, usage })
    }
}
