//! Configuration resolution for the NuGet plugin
//!
//! The host hands over an untyped map. Resolution order per field is:
//! explicit value (when present and correctly typed), then the credential
//! environment variable (API key only), then a fixed default.
//! Resolution never fails; strict checks live in [`crate::validation`].

use super::traits::RawConfig;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

/// Default NuGet source URL
pub const DEFAULT_SOURCE: &str = "https://api.nuget.org/v3/index.json";

/// Default package path pattern
pub const DEFAULT_PACKAGE_PATH: &str = "*.nupkg";

/// Default push timeout in seconds
pub const DEFAULT_TIMEOUT: i64 = 300;

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV: &str = "NUGET_API_KEY";

// snake_case first, camelCase alias second
pub(crate) const API_KEY_KEYS: &[&str] = &["api_key", "apiKey"];
pub(crate) const SOURCE_KEYS: &[&str] = &["source"];
pub(crate) const PACKAGE_PATH_KEYS: &[&str] = &["package_path", "packagePath"];
pub(crate) const SKIP_DUPLICATE_KEYS: &[&str] = &["skip_duplicate", "skipDuplicate"];
pub(crate) const TIMEOUT_KEYS: &[&str] = &["timeout"];

/// Typed lookups over a raw configuration map with env fallback
pub struct ConfigParser<'a> {
    raw: &'a RawConfig,
    env: &'a HashMap<String, String>,
}

impl<'a> ConfigParser<'a> {
    pub fn new(raw: &'a RawConfig, env: &'a HashMap<String, String>) -> Self {
        Self { raw, env }
    }

    fn lookup(&self, keys: &[&str]) -> Option<&'a serde_json::Value> {
        keys.iter().find_map(|key| self.raw.get(*key))
    }

    /// Non-empty string value, else non-empty `env_var`, else `default`
    pub fn get_string(&self, keys: &[&str], env_var: Option<&str>, default: &str) -> String {
        if let Some(value) = self.lookup(keys).and_then(|v| v.as_str())
            && !value.is_empty()
        {
            return value.to_string();
        }

        if let Some(value) = env_var.and_then(|name| self.env.get(name))
            && !value.is_empty()
        {
            return value.clone();
        }

        default.to_string()
    }

    pub fn get_bool(&self, keys: &[&str], default: bool) -> bool {
        self.lookup(keys)
            .and_then(|v| v.as_bool())
            .unwrap_or(default)
    }

    /// Integers are accepted as JSON integers or floats (truncated)
    pub fn get_int(&self, keys: &[&str], default: i64) -> i64 {
        match self.lookup(keys) {
            Some(value) => value
                .as_i64()
                .or_else(|| value.as_f64().map(|f| f as i64))
                .unwrap_or(default),
            None => default,
        }
    }
}

/// Resolved configuration for one invocation
#[derive(Debug)]
pub struct NuGetConfig {
    pub api_key: SecretString,
    pub source: String,
    pub package_path: String,
    pub skip_duplicate: bool,
    pub timeout: i64,
}

impl NuGetConfig {
    /// Resolve a raw configuration map against an environment snapshot
    pub fn resolve(raw: &RawConfig, env: &HashMap<String, String>) -> Self {
        let parser = ConfigParser::new(raw, env);

        Self {
            api_key: SecretString::new(
                parser
                    .get_string(API_KEY_KEYS, Some(API_KEY_ENV), "")
                    .into(),
            ),
            source: parser.get_string(SOURCE_KEYS, None, DEFAULT_SOURCE),
            package_path: parser.get_string(PACKAGE_PATH_KEYS, None, DEFAULT_PACKAGE_PATH),
            skip_duplicate: parser.get_bool(SKIP_DUPLICATE_KEYS, false),
            timeout: parser.get_int(TIMEOUT_KEYS, DEFAULT_TIMEOUT),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }
}
