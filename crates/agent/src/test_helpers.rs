//! Shared test helpers for loop tests.

use async_trait::async_trait;
use mindloop_core::error::{ProviderError, StoreError};
use mindloop_core::message::{Message, MessageToolCall, Role, SessionId};
use mindloop_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use mindloop_core::store::MessageStore;
use std::sync::Mutex;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue and
/// records the request it was given. Panics if more calls are made than
/// responses provided.
pub struct SequentialMockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that returns a single text response (no tool calls).
    pub fn single_text(text: &str) -> Self {
        Self::new(vec![make_text_response(text)])
    }

    #[allow(dead_code)]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    /// The requests seen so far, in call order.
    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);

        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        Ok(response)
    }
}

/// Create a simple text response (no tool calls).
pub fn make_text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Create a response with tool calls and optional thought content.
pub fn make_tool_call_response(tool_calls: Vec<MessageToolCall>, thought: &str) -> ProviderResponse {
    let mut msg = Message::assistant(thought);
    msg.tool_calls = tool_calls;
    ProviderResponse {
        message: msg,
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// Helper to create a tool call.
pub fn make_tool_call(name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: format!("call_{name}"),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

/// A message record captured by [`RecordingStore`].
#[derive(Debug, Clone)]
pub struct RecordedMessage {
    pub id: String,
    pub session_id: SessionId,
    pub role: Role,
    pub content: String,
}

/// An in-memory `MessageStore` that records everything for assertions.
#[derive(Default)]
pub struct RecordingStore {
    messages: Mutex<Vec<RecordedMessage>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<RecordedMessage> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageStore for RecordingStore {
    async fn create_message(
        &self,
        session_id: &SessionId,
        role: Role,
        content: &str,
    ) -> Result<String, StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let id = format!("msg-{}", messages.len() + 1);
        messages.push(RecordedMessage {
            id: id.clone(),
            session_id: session_id.clone(),
            role,
            content: content.to_string(),
        });
        Ok(id)
    }

    async fn append_to_message(&self, message_id: &str, text: &str) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().unwrap();
        let record = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(message_id.to_string()))?;
        record.content.push_str(text);
        Ok(())
    }
}
