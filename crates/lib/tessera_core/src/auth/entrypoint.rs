//! Entrypoint classification.
//!
//! The login entrypoint is a user-supplied identifier of ambiguous kind —
//! email, mobile number, or username — disambiguated by structural
//! inspection so the verifier can look up the matching column.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// International mobile numbers, optional `+` country code, separators allowed.
static MOBILE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?[1-9]\d{1,3}?[-.\s]?\d{1,4}[-.\s]?\d{4,10}$")
        .expect("mobile pattern must compile")
});

/// The structural kind of a login entrypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrypointKind {
    Email,
    Mobile,
    Username,
}

impl fmt::Display for EntrypointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EntrypointKind::Email => "email",
            EntrypointKind::Mobile => "mobile number",
            EntrypointKind::Username => "username",
        };
        f.write_str(label)
    }
}

/// A classified entrypoint value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entrypoint {
    pub kind: EntrypointKind,
    pub value: String,
}

impl Entrypoint {
    /// Classify an entrypoint by structure: `@` plus `.` reads as an email,
    /// an international phone shape as a mobile number, anything else as a
    /// username.
    pub fn parse(value: &str) -> Self {
        let kind = if value.contains('@') && value.contains('.') {
            EntrypointKind::Email
        } else if MOBILE_PATTERN.is_match(value) {
            EntrypointKind::Mobile
        } else {
            EntrypointKind::Username
        };
        Entrypoint {
            kind,
            value: value.to_string(),
        }
    }
}
