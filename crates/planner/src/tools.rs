use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::errors::{AgentError, AgentResult};
use crate::models::tool::Tool;

pub const UPDATE_ARTIFACT: &str = "updateArtifact";

/// What came of a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    /// The call took effect; the notice is recorded in the history as a system message
    Applied { notice: String },
    /// The call was accepted but had no effect
    Skipped { reason: String },
}

/// A capability the model may invoke through a tool call
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// The schema advertised to the model
    fn tool(&self) -> &Tool;

    /// Execute the call with its decoded arguments
    async fn call(&self, arguments: &Map<String, Value>) -> AgentResult<ToolOutcome>;
}

/// Decode a tool call's raw argument payload, which must be a JSON object
pub fn decode_arguments(tool: &str, arguments: &str) -> AgentResult<Map<String, Value>> {
    let malformed = |reason: String| AgentError::MalformedToolArguments {
        tool: tool.to_string(),
        reason,
    };
    match serde_json::from_str::<Value>(arguments).map_err(|e| malformed(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(malformed(format!("expected an object, got {}", other))),
    }
}

/// A string argument; absent and null both read as `None`
fn string_argument(
    tool: &str,
    arguments: &Map<String, Value>,
    name: &str,
) -> AgentResult<Option<String>> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(other) => Err(AgentError::MalformedToolArguments {
            tool: tool.to_string(),
            reason: format!("{} must be a string, got {}", name, other),
        }),
    }
}

/// Tool handlers keyed by tool name, in registration order
#[derive(Default)]
pub struct ToolRegistry {
    handlers: Vec<Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Box<dyn ToolHandler>) -> AgentResult<()> {
        let name = &handler.tool().name;
        if self.get(name).is_some() {
            return Err(AgentError::DuplicateTool(name.clone()));
        }
        self.handlers.push(handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolHandler> {
        self.handlers
            .iter()
            .find(|handler| handler.tool().name == name)
            .map(|v| &**v)
    }

    /// Schemas of every registered tool
    pub fn tools(&self) -> Vec<Tool> {
        self.handlers.iter().map(|h| h.tool().clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

/// How to treat an `updateArtifact` call missing its filename or contents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncompleteCallPolicy {
    /// Drop the call without writing anything or raising an error
    #[default]
    Ignore,
    /// Fail the invocation with `AgentError::IncompleteToolCall`
    Reject,
}

/// Writes a named text artifact through the configured store
pub struct UpdateArtifact {
    tool: Tool,
    store: Arc<dyn ArtifactStore>,
    policy: IncompleteCallPolicy,
}

impl UpdateArtifact {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        let tool = Tool::new(
            UPDATE_ARTIFACT,
            "Create or replace an artifact with the given filename and contents.",
            json!({
                "type": "object",
                "required": ["filename", "contents"],
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "The name of the artifact to update, e.g. plan.md"
                    },
                    "contents": {
                        "type": "string",
                        "description": "The full contents of the artifact"
                    }
                }
            }),
        );
        Self {
            tool,
            store,
            policy: IncompleteCallPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: IncompleteCallPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn incomplete(&self, missing: &str) -> AgentResult<ToolOutcome> {
        match self.policy {
            IncompleteCallPolicy::Ignore => {
                warn!(missing, "ignoring {} call with missing arguments", UPDATE_ARTIFACT);
                Ok(ToolOutcome::Skipped {
                    reason: format!("missing {}", missing),
                })
            }
            IncompleteCallPolicy::Reject => Err(AgentError::IncompleteToolCall {
                tool: UPDATE_ARTIFACT.to_string(),
                missing: missing.to_string(),
            }),
        }
    }
}

#[async_trait]
impl ToolHandler for UpdateArtifact {
    fn tool(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: &Map<String, Value>) -> AgentResult<ToolOutcome> {
        let filename =
            string_argument(UPDATE_ARTIFACT, arguments, "filename")?.filter(|f| !f.is_empty());
        let contents =
            string_argument(UPDATE_ARTIFACT, arguments, "contents")?.filter(|c| !c.is_empty());
        let (filename, contents) = match (filename, contents) {
            (Some(filename), Some(contents)) => (filename, contents),
            (None, Some(_)) => return self.incomplete("filename"),
            (Some(_), None) => return self.incomplete("contents"),
            (None, None) => return self.incomplete("filename, contents"),
        };

        self.store
            .write(&filename, &contents)
            .await
            .map_err(|source| AgentError::Artifact {
                filename: filename.clone(),
                source,
            })?;

        Ok(ToolOutcome::Applied {
            notice: format!("The artifact '{}' was updated.", filename),
        })
    }
}
