use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{CompletionResponse, Provider, Usage};
use crate::providers::configs::GenerationConfig;

/// A request as seen by the mock provider
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tools: Vec<Tool>,
    pub generation: GenerationConfig,
}

/// A mock provider that returns pre-configured responses for testing
#[derive(Clone, Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Result<CompletionResponse, String>>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of responses
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().map(Ok).collect())),
            calls: Arc::default(),
        }
    }

    /// Create a mock provider whose next call fails with the given message
    pub fn failing(message: &str) -> Self {
        Self {
            responses: Arc::new(Mutex::new(vec![Err(message.to_string())])),
            calls: Arc::default(),
        }
    }

    /// Every call made so far, oldest first
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        generation: &GenerationConfig,
    ) -> Result<(CompletionResponse, Usage)> {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tools: tools.to_vec(),
            generation: generation.clone(),
        });

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            return Ok((CompletionResponse::text(""), Usage::default()));
        }
        match responses.remove(0) {
            Ok(response) => Ok((response, Usage::default())),
            Err(message) => Err(anyhow!(message)),
        }
    }
}
