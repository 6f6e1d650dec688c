//! Secret redaction for log lines and surfaced error text.
//!
//! Graph access tokens travel in `Authorization` headers, `access_token`
//! query parameters and occasionally echoed JSON bodies. Anything that may be
//! logged or returned to the caller goes through [`redact_string`] first.

use lazy_static::lazy_static;
use regex::Regex;

const REDACTED: &str = "***REDACTED***";

lazy_static! {
    static ref SECRET_PATTERNS: Vec<(Regex, String)> = vec![
        // Bearer tokens in Authorization headers
        (
            Regex::new(r"(?i)(authorization:\s*bearer\s+)[a-zA-Z0-9_\-.]+").unwrap(),
            format!("${{1}}{}", REDACTED),
        ),
        // Token-ish query parameters
        (
            Regex::new(r"(?i)([?&](?:access_token|input_token|client_secret|appsecret_proof)=)[^&\s]+").unwrap(),
            format!("${{1}}{}", REDACTED),
        ),
        // JSON fields
        (
            Regex::new(r##"(?i)("(?:accessToken|access_token|token|secret|client_secret|authorization)":\s*")[^"]+"##).unwrap(),
            format!("${{1}}{}", REDACTED),
        ),
        // Bare Meta user/page tokens
        (
            Regex::new(r"\bEAA[a-zA-Z0-9]{20,}").unwrap(),
            "***GRAPH_TOKEN_REDACTED***".to_string(),
        ),
    ];
}

/// Replace every recognised secret in `message`.
pub fn redact_string(message: &str) -> String {
    let mut result = message.to_string();
    for (pattern, replacement) in SECRET_PATTERNS.iter() {
        result = pattern
            .replace_all(&result, replacement.as_str())
            .into_owned();
    }
    result
}

/// Wrapper that redacts its content when displayed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redacted<'a>(pub &'a str);

impl std::fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&redact_string(self.0))
    }
}
