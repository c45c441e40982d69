//! Shared model-call settings.

use mindloop_core::message::Message;
use mindloop_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;

/// The provider handle and generation parameters shared by the planning,
/// decision, and direct-answer stages of a run.
#[derive(Clone)]
pub struct ModelSettings {
    pub provider: Arc<dyn Provider>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Build a request with these settings. Internal tool execution stays
    /// disabled — proposed tool calls must come back unexecuted.
    pub(crate) fn request(&self, messages: Vec<Message>) -> ProviderRequest {
        let mut request = ProviderRequest::new(&self.model, messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockProvider;

    #[test]
    fn builder_sets_generation_parameters() {
        let settings = ModelSettings::new(
            Arc::new(SequentialMockProvider::single_text("hi")),
            "mock-model",
        )
        .with_temperature(0.1)
        .with_max_tokens(512);

        let request = settings.request(vec![Message::user("hello")]);
        assert_eq!(request.model, "mock-model");
        assert!((request.temperature - 0.1).abs() < f32::EPSILON);
        assert_eq!(request.max_tokens, Some(512));
        assert!(!request.internal_tool_execution);
    }
}
