//! Package path validation (path traversal protection)
//!
//! Absolute patterns are allowed because CI/CD artifact directories are
//! usually absolute. Only `..` traversal is refused.

use std::path::MAIN_SEPARATOR;
use thiserror::Error;

/// Characters with glob meaning, replaced before lexical cleaning
const WILDCARDS: &[char] = &['*', '?', '[', ']'];

/// Errors raised while validating a package path pattern
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("package path cannot be empty")]
    Empty,

    #[error("path traversal detected: cannot use '..'")]
    Traversal,

    #[error("path traversal detected: cannot escape working directory")]
    Escape,
}

impl PathError {
    pub fn is_traversal(&self) -> bool {
        matches!(self, Self::Traversal | Self::Escape)
    }
}

fn is_separator(c: char) -> bool {
    c == '/' || c == MAIN_SEPARATOR
}

/// Lexically clean a path: drop `.` and empty components, fold `dir/..`
pub(crate) fn clean_path(path: &str) -> String {
    let rooted = path.starts_with(is_separator);
    let mut parts: Vec<&str> = Vec::new();

    for component in path.split(is_separator) {
        match component {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                // `/..` is `/`
                _ if rooted => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }

    let joined = parts.join(&MAIN_SEPARATOR.to_string());
    match (rooted, joined.is_empty()) {
        (true, _) => format!("{}{}", MAIN_SEPARATOR, joined),
        (false, true) => ".".to_string(),
        (false, false) => joined,
    }
}

/// Validate a package path pattern before it is expanded
pub fn validate_package_path(pattern: &str) -> Result<(), PathError> {
    if pattern.is_empty() {
        return Err(PathError::Empty);
    }

    if pattern.contains("..") {
        return Err(PathError::Traversal);
    }

    let placeholder: String = pattern
        .chars()
        .map(|c| if WILDCARDS.contains(&c) { 'x' } else { c })
        .collect();
    let cleaned = clean_path(&placeholder);

    let escaped_separator = format!("{}..", MAIN_SEPARATOR);
    if cleaned.starts_with("..") || cleaned.contains(&escaped_separator) {
        return Err(PathError::Escape);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_relative_patterns() {
        for pattern in [
            "*.nupkg",
            "artifacts/*.nupkg",
            "./bin/Release/*.nupkg",
            "build/**/MyLib.?.nupkg",
            "out/[ab]*.nupkg",
            "MyLib.1.0.0.nupkg",
        ] {
            assert_eq!(validate_package_path(pattern), Ok(()), "{pattern}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_absolute_patterns_are_allowed() {
        for pattern in [
            "/home/runner/work/artifacts/*.nupkg",
            "/tmp/MyLib.1.0.0.nupkg",
            "/*.nupkg",
        ] {
            assert_eq!(validate_package_path(pattern), Ok(()), "{pattern}");
        }
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert_eq!(validate_package_path(""), Err(PathError::Empty));
    }

    #[test]
    fn test_traversal_is_rejected() {
        for pattern in [
            "../../../etc/passwd",
            "../*.nupkg",
            "artifacts/../../*.nupkg",
            "/tmp/../etc/*.nupkg",
            "foo..bar.nupkg",
            "..",
        ] {
            let err = validate_package_path(pattern).unwrap_err();
            assert!(err.to_string().contains("traversal"), "{pattern}: {err}");
            assert!(err.is_traversal());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("a/b/../c"), "a/c");
        assert_eq!(clean_path("./a//b/."), "a/b");
        assert_eq!(clean_path("../a"), "../a");
        assert_eq!(clean_path("a/../../b"), "../b");
        assert_eq!(clean_path("/../a"), "/a");
        assert_eq!(clean_path("/"), "/");
        assert_eq!(clean_path(""), ".");
        assert_eq!(clean_path("x.nupkg"), "x.nupkg");
    }
}
