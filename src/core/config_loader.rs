//! Configuration file loader for the nuget-publisher binary
//!
//! Reads a YAML, TOML or JSON document into the raw config map and expands
//! `${VAR}` references from an environment snapshot.

use super::traits::RawConfig;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tokio::fs;

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Z_][A-Z0-9_]*)\}";

static ENV_VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(ENV_VAR_PATTERN).unwrap_or_else(|e| panic!("invalid env pattern: {e}"))
});

/// Configuration file loading errors
#[derive(Error, Debug)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config: {message}")]
    Parse {
        format: ConfigFormat,
        message: String,
    },

    #[error("config file root must be a mapping")]
    NotAMapping,

    #[error("environment variable {0} referenced in config is not set")]
    UndefinedVariable(String),
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigFormat {
    /// Pick a format from the file extension, defaulting to JSON
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

impl std::fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "YAML"),
            Self::Toml => write!(f, "TOML"),
            Self::Json => write!(f, "JSON"),
        }
    }
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a config file and expand environment references
    pub async fn load_file(
        path: &Path,
        env: &HashMap<String, String>,
    ) -> Result<RawConfig, ConfigLoadError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ConfigLoadError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let raw = Self::parse(&content, ConfigFormat::from_path(path))?;
        Self::expand_env_vars(raw, env)
    }

    /// Parse document text into the raw config map
    pub fn parse(content: &str, format: ConfigFormat) -> Result<RawConfig, ConfigLoadError> {
        let parse_error = |message: String| ConfigLoadError::Parse { format, message };

        let value: Value = match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?
            }
        };

        match value {
            Value::Object(map) => Ok(map),
            // An empty YAML document
            Value::Null => Ok(RawConfig::new()),
            _ => Err(ConfigLoadError::NotAMapping),
        }
    }

    /// Expand `${VAR}` in every string value
    pub fn expand_env_vars(
        raw: RawConfig,
        env: &HashMap<String, String>,
    ) -> Result<RawConfig, ConfigLoadError> {
        raw.into_iter()
            .map(|(key, value)| Self::expand_value(value, env).map(|value| (key, value)))
            .collect()
    }

    fn expand_value(value: Value, env: &HashMap<String, String>) -> Result<Value, ConfigLoadError> {
        match value {
            Value::String(s) => Ok(Value::String(Self::expand_string(&s, env)?)),
            Value::Array(items) => items
                .into_iter()
                .map(|v| Self::expand_value(v, env))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => Self::expand_env_vars(map, env).map(Value::Object),
            other => Ok(other),
        }
    }

    fn expand_string(input: &str, env: &HashMap<String, String>) -> Result<String, ConfigLoadError> {
        let mut result = String::with_capacity(input.len());
        let mut last = 0;

        for cap in ENV_VAR_REGEX.captures_iter(input) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            let value = env
                .get(name.as_str())
                .ok_or_else(|| ConfigLoadError::UndefinedVariable(name.as_str().to_string()))?;

            result.push_str(&input[last..whole.start()]);
            result.push_str(value);
            last = whole.end();
        }

        result.push_str(&input[last..]);
        Ok(result)
    }
}
