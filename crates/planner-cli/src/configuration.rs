use crate::error::{missing_field_path, to_env_var, ConfigError, ENV_PREFIX};
use config::{Config, Environment, File};
use planner::providers::configs::{GenerationConfig, OpenAiProviderConfig, DEFAULT_OPENAI_HOST};
use planner::tools::IncompleteCallPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    #[serde(default = "default_openai_host")]
    pub host: String,
    pub api_key: String,
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig::new(self.host, self.api_key)
    }
}

#[derive(Debug, Deserialize)]
pub struct ArtifactSettings {
    #[serde(default = "default_artifacts_dir")]
    pub dir: PathBuf,
}

impl Default for ArtifactSettings {
    fn default() -> Self {
        Self {
            dir: default_artifacts_dir(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ToolSettings {
    /// What to do with an `updateArtifact` call missing its filename or contents
    #[serde(default)]
    pub incomplete_calls: IncompleteCallPolicy,
}

#[derive(Debug, Default, Deserialize)]
pub struct AgentSettings {
    /// Template replacing the built-in planning instructions
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub artifacts: ArtifactSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    /// Load settings from defaults, then the optional TOML file, then the environment
    pub fn new(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_and_validate(config_file)
    }

    fn load_and_validate(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("provider.host", default_openai_host())?
            .set_default("generation.model", GenerationConfig::default().model)?;

        if let Some(path) = config_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = match config.try_deserialize() {
            Ok(settings) => settings,
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                return if let Some(field) = missing_field_path(&err.to_string()) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                };
            }
        };

        settings
            .generation
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(settings)
    }
}

fn default_openai_host() -> String {
    DEFAULT_OPENAI_HOST.to_string()
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
