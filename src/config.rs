use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::{Validate, ValidationError};

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Finder configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FinderConfig {
    /// Table alias of the root entity when the query gives none
    #[validate(custom(function = "validate_identifier"))]
    pub root_alias: String,

    /// Prefix of generated column aliases (`<prefix><node>_<n>`)
    #[validate(custom(function = "validate_identifier"))]
    pub column_alias_prefix: String,

    /// Longest relation path accepted, via bridges included
    #[validate(range(
        min = 1,
        max = 64,
        message = "Max relation depth must be between 1 and 64"
    ))]
    pub max_relation_depth: usize,

    /// Log every compiled statement at info level
    pub log_sql: bool,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            root_alias: "t".to_string(),
            column_alias_prefix: "c".to_string(),
            max_relation_depth: 16,
            log_sql: false,
        }
    }
}

impl FinderConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            root_alias: env::var("RELGRAPH_ROOT_ALIAS").unwrap_or_else(|_| "t".to_string()),
            column_alias_prefix: env::var("RELGRAPH_COLUMN_ALIAS_PREFIX")
                .unwrap_or_else(|_| "c".to_string()),
            max_relation_depth: parse_env_var("RELGRAPH_MAX_RELATION_DEPTH", "16")?,
            log_sql: parse_env_var("RELGRAPH_LOG_SQL", "false")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

fn validate_identifier(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        let mut error = ValidationError::new("identifier");
        error.message = Some("must be a plain SQL identifier".into());
        Err(error)
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
