use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Invalid history: {0}")]
    InvalidHistory(String),

    /// Any failure from the completion client, passed through untouched
    #[error(transparent)]
    Client(#[from] anyhow::Error),

    #[error("Malformed arguments for tool {tool}: {reason}")]
    MalformedToolArguments { tool: String, reason: String },

    #[error("Incomplete call to tool {tool}: missing {missing}")]
    IncompleteToolCall { tool: String, missing: String },

    #[error("Failed to write artifact '{filename}': {source}")]
    Artifact {
        filename: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Delegation failed: {0}")]
    Delegation(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Template error: {0}")]
    Template(String),
}

pub type AgentResult<T> = Result<T, AgentError>;
