use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};
use tracing::warn;

use super::base::CompletionResponse;
use crate::models::message::Message;
use crate::models::tool::{Tool, ToolRequest};

lazy_static! {
    static ref FUNCTION_NAME: Regex = Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap();
}

/// Convert internal Message format to OpenAI's API message specification
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role,
                "content": message.content,
            })
        })
        .collect()
}

/// Convert internal Tool format to OpenAI's API tool specification
pub fn tools_to_openai_spec(tools: &[Tool]) -> Result<Vec<Value>> {
    let mut tool_names = std::collections::HashSet::new();
    let mut result = Vec::new();

    for tool in tools {
        if !is_valid_function_name(&tool.name) {
            return Err(anyhow!(
                "Invalid tool name '{}', it must match this regex [a-zA-Z0-9_-]+",
                tool.name
            ));
        }
        if !tool_names.insert(&tool.name) {
            return Err(anyhow!("Duplicate tool name: {}", tool.name));
        }

        result.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.input_schema,
            }
        }));
    }

    Ok(result)
}

/// Convert OpenAI's API response to a completion response.
///
/// At most one tool request is kept: the first entry of `tool_calls`, or the legacy
/// `function_call` field when `tool_calls` is absent.
pub fn openai_response_to_completion(response: &Value) -> Result<CompletionResponse> {
    let original = response
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .ok_or_else(|| anyhow!("No message in response: {}", response))?;

    let content = original
        .get("content")
        .and_then(|text| text.as_str())
        .map(String::from);

    let tool_calls = original
        .get("tool_calls")
        .and_then(|calls| calls.as_array())
        .filter(|calls| !calls.is_empty());

    let tool_request = match tool_calls {
        Some(calls) => {
            if calls.len() > 1 {
                warn!(count = calls.len(), "keeping only the first tool call");
            }
            let call = &calls[0];
            Some(function_to_tool_request(
                call["id"].as_str().unwrap_or_default(),
                &call["function"],
            )?)
        }
        None => match original.get("function_call") {
            Some(function) if !function.is_null() => {
                Some(function_to_tool_request("function_call", function)?)
            }
            _ => None,
        },
    };

    Ok(CompletionResponse {
        content,
        tool_request,
    })
}

fn function_to_tool_request(id: &str, function: &Value) -> Result<ToolRequest> {
    let name = function["name"]
        .as_str()
        .ok_or_else(|| anyhow!("Tool call without a function name: {}", function))?;
    // Arguments stay encoded; they are decoded by the handler of the named tool
    let arguments = match &function["arguments"] {
        Value::String(arguments) => arguments.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    Ok(ToolRequest::new(id, name, arguments))
}

fn is_valid_function_name(name: &str) -> bool {
    FUNCTION_NAME.is_match(name)
}

#[derive(Debug, thiserror::Error)]
#[error("Context length exceeded. Message: {0}")]
pub struct ContextLengthExceededError(String);

pub fn check_openai_context_length_error(error: &Value) -> Option<ContextLengthExceededError> {
    let code = error.get("code")?.as_str()?;
    if code == "context_length_exceeded" || code == "string_above_max_length" {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        Some(ContextLengthExceededError(message))
    } else {
        None
    }
}
