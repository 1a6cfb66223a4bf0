//! Error handling for the NuGet plugin
//!
//! Every input-driven failure is folded into an [`ExecuteResponse`](crate::core::ExecuteResponse)
//! before it reaches the host. These types carry the structural reason up to that point.

use crate::security::{CommandError, SourceUrlError};
use crate::validation::PathError;
use thiserror::Error;

/// Main error type for push operations
#[derive(Error, Debug)]
pub enum PluginError {
    // Configuration errors
    #[error("API key is required (set api_key or NUGET_API_KEY environment variable)")]
    ApiKeyMissing,

    #[error("invalid source URL: {0}")]
    InvalidSource(#[from] SourceUrlError),

    #[error("invalid package path: {0}")]
    InvalidPackagePath(#[source] PathError),

    #[error("timeout must be a positive integer (got {0})")]
    InvalidTimeout(i64),

    // Discovery errors
    #[error("invalid glob pattern: {0}")]
    InvalidPattern(String),

    #[error("no packages found matching pattern: {0}")]
    NoPackagesFound(String),

    // Push errors
    #[error("failed to push package {package}: {output}: {source}")]
    PushFailed {
        package: String,
        output: String,
        #[source]
        source: CommandError,
    },
}

impl PluginError {
    /// Security denials must never be retried
    pub fn is_security_denial(&self) -> bool {
        match self {
            Self::InvalidSource(e) => e.is_security_denial(),
            Self::InvalidPackagePath(e) => e.is_traversal(),
            _ => false,
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::ApiKeyMissing => "API_KEY_MISSING",
            Self::InvalidSource(_) => "INVALID_SOURCE",
            Self::InvalidPackagePath(_) => "INVALID_PACKAGE_PATH",
            Self::InvalidTimeout(_) => "INVALID_TIMEOUT",
            Self::InvalidPattern(_) => "INVALID_PATTERN",
            Self::NoPackagesFound(_) => "NO_PACKAGES_FOUND",
            Self::PushFailed { .. } => "PUSH_FAILED",
        }
    }
}
