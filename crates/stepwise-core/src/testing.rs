//! Shared test doubles for the engine.

use std::sync::{Arc, Mutex};

use stepwise_types::event::{EventKind, ExecutionEvent};
use stepwise_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};

use crate::event::EventSink;
use crate::llm::box_provider::BoxLlmProvider;
use crate::llm::provider::LlmProvider;

type Script = dyn Fn(&CompletionRequest, usize) -> Result<CompletionResponse, LlmError> + Send + Sync;

/// Requests seen by a [`ScriptedProvider`], shared after it is boxed.
pub(crate) type RequestLog = Arc<Mutex<Vec<CompletionRequest>>>;

/// A successful reply with fixed usage (100 prompt, 50 completion tokens).
pub(crate) fn reply(content: &str) -> Result<CompletionResponse, LlmError> {
    Ok(CompletionResponse {
        content: content.to_string(),
        usage: Usage {
            prompt_tokens: 100,
            completion_tokens: 50,
        },
    })
}

/// Provider whose answers come from a closure of (request, 0-based call index).
pub(crate) struct ScriptedProvider {
    script: Box<Script>,
    requests: RequestLog,
}

impl ScriptedProvider {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(&CompletionRequest, usize) -> Result<CompletionResponse, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answers `content`.
    pub(crate) fn replying(content: &'static str) -> Self {
        Self::new(move |_, _| reply(content))
    }

    /// Answers with `contents` in call order, repeating the last one.
    pub(crate) fn sequence(contents: Vec<&'static str>) -> Self {
        Self::new(move |_, index| {
            let content = contents
                .get(index)
                .or_else(|| contents.last())
                .copied()
                .unwrap_or_default();
            reply(content)
        })
    }

    pub(crate) fn request_log(&self) -> RequestLog {
        Arc::clone(&self.requests)
    }

    pub(crate) fn boxed(self) -> BoxLlmProvider {
        BoxLlmProvider::new(self)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len() - 1
        };
        (self.script)(request, index)
    }
}

/// Sink that keeps every event for later inspection.
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: Arc<Mutex<Vec<ExecutionEvent>>>,
}

impl RecordingSink {
    pub(crate) fn events(&self) -> Vec<ExecutionEvent> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn kinds(&self) -> Vec<EventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: ExecutionEvent) {
        self.events.lock().unwrap().push(event);
    }
}
