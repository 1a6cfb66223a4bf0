//! Core traits and types shared with the release host
//!
//! This module defines the plugin interface, the lifecycle hooks the host
//! dispatches, and the request/response shapes exchanged on every call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tokio_util::sync::CancellationToken;

/// Raw, untyped plugin configuration as handed over by the host
pub type RawConfig = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Hooks
// ============================================================================

/// Release lifecycle stages a plugin can subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Hook {
    PreInit,
    PostInit,
    PrePlan,
    PostPlan,
    PreVersion,
    PostVersion,
    PreNotes,
    PostNotes,
    PreApprove,
    PostApprove,
    PrePublish,
    PostPublish,
    OnSuccess,
    OnError,
}

impl Hook {
    /// Get the hook name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PreInit => "pre-init",
            Self::PostInit => "post-init",
            Self::PrePlan => "pre-plan",
            Self::PostPlan => "post-plan",
            Self::PreVersion => "pre-version",
            Self::PostVersion => "post-version",
            Self::PreNotes => "pre-notes",
            Self::PostNotes => "post-notes",
            Self::PreApprove => "pre-approve",
            Self::PostApprove => "post-approve",
            Self::PrePublish => "pre-publish",
            Self::PostPublish => "post-publish",
            Self::OnSuccess => "on-success",
            Self::OnError => "on-error",
        }
    }

    /// Parse hook from string
    pub fn parse(s: &str) -> Option<Self> {
        Self::all().iter().copied().find(|hook| hook.as_str() == s)
    }

    /// Get all hooks in lifecycle order
    pub fn all() -> &'static [Hook] {
        &[
            Self::PreInit,
            Self::PostInit,
            Self::PrePlan,
            Self::PostPlan,
            Self::PreVersion,
            Self::PostVersion,
            Self::PreNotes,
            Self::PostNotes,
            Self::PreApprove,
            Self::PostApprove,
            Self::PrePublish,
            Self::PostPublish,
            Self::OnSuccess,
            Self::OnError,
        ]
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Metadata
// ============================================================================

/// Plugin metadata exposed to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub author: String,
    pub hooks: Vec<Hook>,
    /// JSON schema describing the recognized configuration options
    #[serde(rename = "configSchema")]
    pub config_schema: String,
}

// ============================================================================
// Execution
// ============================================================================

/// Release information supplied by the host
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseContext {
    /// Release version, possibly prefixed with `v`
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
}

/// A single hook invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub hook: Hook,
    #[serde(default)]
    pub config: RawConfig,
    #[serde(default)]
    pub context: ReleaseContext,
    #[serde(default)]
    pub dry_run: bool,
}

/// Outcome of a hook invocation
///
/// Exactly one of `message` (success) or `error` (failure) is set by the
/// constructors. `outputs` carries structured side-channel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub outputs: HashMap<String, serde_json::Value>,
}

impl ExecuteResponse {
    /// Successful outcome with a human-readable message
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            error: None,
            outputs: HashMap::new(),
        }
    }

    /// Failed outcome with an error description
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error.into()),
            outputs: HashMap::new(),
        }
    }

    /// Attach a structured output value
    pub fn with_output(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.outputs.insert(key.to_string(), value.into());
        self
    }

    /// Message or error text, whichever is set
    pub fn text(&self) -> &str {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or_default()
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Field-scoped validation error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    #[serde(default = "default_error_code")]
    pub code: String,
}

fn default_error_code() -> String {
    "invalid".to_string()
}

/// Result of configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
}

/// Accumulates validation errors without stopping at the first one
#[derive(Debug, Default)]
pub struct ValidationBuilder {
    errors: Vec<ValidationError>,
}

impl ValidationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) -> &mut Self {
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.into(),
            code: default_error_code(),
        });
        self
    }

    pub fn build(self) -> ValidateResponse {
        ValidateResponse {
            valid: self.errors.is_empty(),
            errors: self.errors,
        }
    }
}

// ============================================================================
// Plugin Trait
// ============================================================================

/// Interface the release host drives
///
/// `execute` returns `Ok` for every input-driven outcome, including failed
/// pushes. `Err` is reserved for broken internal contracts.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Plugin metadata
    fn info(&self) -> PluginInfo;

    /// Run the plugin for a given hook
    async fn execute(
        &self,
        request: ExecuteRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<ExecuteResponse>;

    /// Validate raw configuration ahead of any execution
    async fn validate(&self, config: &RawConfig) -> anyhow::Result<ValidateResponse>;
}
