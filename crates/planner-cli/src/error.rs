use thiserror::Error;

pub const ENV_PREFIX: &str = "PLANNER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required configuration, set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted configuration key, e.g. `provider.api_key`
pub fn to_env_var(field_path: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        field_path.to_uppercase().replace('.', "__")
    )
}

/// Pull the dotted key out of a serde "missing field" message, including the
/// enclosing key when the message names one
pub fn missing_field_path(message: &str) -> Option<String> {
    let field = between(message, "missing field `")?;
    match between(message, "for key `") {
        Some(key) if !key.is_empty() => Some(format!("{}.{}", key, field)),
        _ => Some(field.to_string()),
    }
}

fn between<'a>(message: &'a str, start: &str) -> Option<&'a str> {
    let rest = &message[message.find(start)? + start.len()..];
    Some(&rest[..rest.find('`')?])
}
