//! Package discovery
//!
//! Expands a package path pattern and keeps only `.nupkg` files.

use crate::core::error::PluginError;
use crate::validation::validate_package_path;
use glob::glob;
use tracing::{debug, warn};

/// Recognized package artifact extension
pub const PACKAGE_EXTENSION: &str = ".nupkg";

/// Find package files matching `pattern`, in enumeration order
///
/// The pattern is re-validated so this is safe to call on its own.
/// An empty result is not an error here.
pub fn find_packages(pattern: &str) -> Result<Vec<String>, PluginError> {
    validate_package_path(pattern).map_err(PluginError::InvalidPackagePath)?;

    let entries = glob(pattern).map_err(|e| PluginError::InvalidPattern(e.to_string()))?;

    let mut packages = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!(error = %e, "skipping unreadable path");
                continue;
            }
        };

        let display = path.to_string_lossy().to_string();
        if display.to_lowercase().ends_with(PACKAGE_EXTENSION) {
            packages.push(display);
        }
    }

    debug!(pattern, count = packages.len(), "package discovery finished");
    Ok(packages)
}
