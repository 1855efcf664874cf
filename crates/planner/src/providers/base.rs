use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::configs::GenerationConfig;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolRequest};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// The complete, non-streamed result of one completion call.
///
/// Text and a tool request are independent: a model may return either, both or neither.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub tool_request: Option<ToolRequest>,
}

impl CompletionResponse {
    pub fn text<S: Into<String>>(content: S) -> Self {
        Self {
            content: Some(content.into()),
            tool_request: None,
        }
    }

    pub fn with_tool_request(mut self, tool_request: ToolRequest) -> Self {
        self.tool_request = Some(tool_request);
        self
    }
}

/// Base trait for AI providers (OpenAI-compatible endpoints and test doubles)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate a complete response for the given messages, letting the model choose
    /// freely between replying in text and calling one of the tools
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        generation: &GenerationConfig,
    ) -> Result<(CompletionResponse, Usage)>;
}
