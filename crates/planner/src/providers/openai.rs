use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::base::{CompletionResponse, Provider, Usage};
use super::configs::{GenerationConfig, OpenAiProviderConfig};
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_completion,
    tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Usage {
        let Some(usage) = data.get("usage") else {
            return Usage::default();
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/v1/chat/completions",
            self.config.host.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                Err(anyhow!("Server error: {}", status))
            }
            status => {
                // Error bodies carry the reason, e.g. an invalid key or a context length error
                let body: Value = response.json().await.unwrap_or(Value::Null);
                if let Some(error) = body.get("error") {
                    if let Some(err) = check_openai_context_length_error(error) {
                        return Err(err.into());
                    }
                }
                Err(anyhow!("Request failed: {}\nResponse: {}", status, body))
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[Tool],
        generation: &GenerationConfig,
    ) -> Result<(CompletionResponse, Usage)> {
        let mut payload = json!({
            "model": generation.model,
            "messages": messages_to_openai_spec(messages),
            "stream": false,
        });
        let options = payload
            .as_object_mut()
            .ok_or_else(|| anyhow!("payload must be an object"))?;

        if !tools.is_empty() {
            options.insert("tools".to_string(), json!(tools_to_openai_spec(tools)?));
            options.insert("tool_choice".to_string(), json!("auto"));
        }
        if let Some(temp) = generation.temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = generation.max_tokens {
            options.insert("max_tokens".to_string(), json!(tokens));
        }

        debug!(model = %generation.model, messages = messages.len(), tools = tools.len(), "requesting completion");
        let response = self.post(payload).await?;

        // Raise specific error if context length is exceeded
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error));
        }

        let completion = openai_response_to_completion(&response)?;
        let usage = Self::get_usage(&response);

        Ok((completion, usage))
    }
}
