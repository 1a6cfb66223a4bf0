//! Configuration validation
//!
//! Two entry points share the same field rules:
//! - [`validate_config`] runs before a push and stops at the first violation.
//! - [`validate_raw_config`] serves the host's authoring-time check and
//!   reports every violation. It never requires an API key, since the key
//!   may arrive through `NUGET_API_KEY` at run time.

use super::package_path::validate_package_path;
use crate::core::config::{
    ConfigParser, DEFAULT_PACKAGE_PATH, DEFAULT_SOURCE, DEFAULT_TIMEOUT, NuGetConfig,
    PACKAGE_PATH_KEYS, SOURCE_KEYS, TIMEOUT_KEYS,
};
use crate::core::error::PluginError;
use crate::core::traits::{RawConfig, ValidateResponse, ValidationBuilder};
use crate::security::url_validator::{HostResolver, validate_source_url};
use std::collections::HashMap;

/// Validate a resolved configuration before any side effect
pub async fn validate_config(
    config: &NuGetConfig,
    resolver: &dyn HostResolver,
) -> Result<(), PluginError> {
    if !config.has_api_key() {
        return Err(PluginError::ApiKeyMissing);
    }

    validate_source_url(&config.source, resolver).await?;

    validate_package_path(&config.package_path).map_err(PluginError::InvalidPackagePath)?;

    if config.timeout <= 0 {
        return Err(PluginError::InvalidTimeout(config.timeout));
    }

    Ok(())
}

/// Validate raw configuration, collecting every field error
pub async fn validate_raw_config(raw: &RawConfig, resolver: &dyn HostResolver) -> ValidateResponse {
    let no_env = HashMap::new();
    let parser = ConfigParser::new(raw, &no_env);
    let mut builder = ValidationBuilder::new();

    let source = parser.get_string(SOURCE_KEYS, None, DEFAULT_SOURCE);
    if let Err(e) = validate_source_url(&source, resolver).await {
        builder.add_error("source", e.to_string());
    }

    let package_path = parser.get_string(PACKAGE_PATH_KEYS, None, DEFAULT_PACKAGE_PATH);
    if let Err(e) = validate_package_path(&package_path) {
        builder.add_error("package_path", e.to_string());
    }

    if parser.get_int(TIMEOUT_KEYS, DEFAULT_TIMEOUT) <= 0 {
        builder.add_error("timeout", "must be a positive integer");
    }

    builder.build()
}
