//! Credential masking for safe logging
//!
//! The API key travels on the `dotnet` command line, so anything that logs
//! or reports that command line, or the tool's own output, goes through here.

/// Shorter tokens are masked whole and never searched for in free text
const MIN_PARTIAL_MASK_LEN: usize = 10;

/// Masks a token for safe logging
///
/// Shows only the first 3 and last 3 characters for identification purposes.
/// Tokens shorter than 10 characters are fully masked as "****".
///
/// # Examples
///
/// ```
/// use nuget_publisher::security::mask_token;
///
/// assert_eq!(mask_token("abcdef123456"), "abc...456");
/// assert_eq!(mask_token("short"), "****");
/// ```
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < MIN_PARTIAL_MASK_LEN {
        return "****".to_string();
    }

    let prefix: String = chars[..3].iter().collect();
    let suffix: String = chars[chars.len() - 3..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// Replace every occurrence of `secret` in `text` with its masked form
///
/// Secrets shorter than 10 characters are left alone: they match ordinary
/// words and paths too often for a substring replace to be safe.
pub fn mask_secret_in(text: &str, secret: &str) -> String {
    if secret.chars().count() < MIN_PARTIAL_MASK_LEN {
        return text.to_string();
    }
    text.replace(secret, &mask_token(secret))
}

/// Copy of an argument vector with the value after `flag` masked
pub fn redact_flag_value(args: &[String], flag: &str) -> Vec<String> {
    let mut redacted = Vec::with_capacity(args.len());
    let mut mask_next = false;

    for arg in args {
        if mask_next {
            redacted.push(mask_token(arg));
            mask_next = false;
        } else {
            mask_next = arg == flag;
            redacted.push(arg.clone());
        }
    }

    redacted
}
