use serde::{Deserialize, Serialize};

use crate::errors::{AgentError, AgentResult};

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_OPENAI_HOST: &str = "https://api.openai.com";

pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
}

impl OpenAiProviderConfig {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            api_key: api_key.into(),
        }
    }
}

/// Generation parameters forwarded with every completion call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Model identifier understood by the endpoint
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature, provider default when unset
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Upper bound on generated tokens, provider default when unset
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: i32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn validate(&self) -> AgentResult<()> {
        if self.model.trim().is_empty() {
            return Err(AgentError::InvalidConfig("model must not be empty".to_string()));
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(AgentError::InvalidConfig(format!(
                    "temperature must be between 0.0 and 2.0, got {}",
                    temperature
                )));
            }
        }
        if let Some(max_tokens) = self.max_tokens {
            if max_tokens <= 0 {
                return Err(AgentError::InvalidConfig(format!(
                    "max_tokens must be positive, got {}",
                    max_tokens
                )));
            }
        }
        Ok(())
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
