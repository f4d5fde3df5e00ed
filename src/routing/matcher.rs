//! Virtual host matching.
//!
//! # Responsibilities
//! - Normalize the Host header (lowercase, drop `:port`)
//! - Compile vhost patterns into anchored regexes
//!
//! # Design Decisions
//! - Host matching is case-insensitive: the header is lowercased, the
//!   pattern is used as written
//! - Patterns are wrapped as `^(?:...)$` so alternations stay anchored
//! - Regexes are compiled once when the route table is built

use regex::Regex;

use crate::error::CompileError;

/// Lowercase a Host header value and strip a trailing `:port`.
///
/// Bracketed IPv6 literals keep their brackets; a bare IPv6 literal is left
/// untouched since its colons are not a port separator.
pub fn normalize_host(raw: &str) -> String {
    let host = raw.trim().to_ascii_lowercase();

    match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (name.starts_with('[') || !name.contains(':')) =>
        {
            name.to_string()
        }
        _ => host,
    }
}

/// An anchored vhost pattern.
#[derive(Debug, Clone)]
pub struct VhostPattern {
    source: String,
    regex: Regex,
}

impl VhostPattern {
    /// Compile a vhost pattern.
    pub fn compile(source: impl Into<String>) -> Result<Self, CompileError> {
        let source = source.into();
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(|e| {
            CompileError::VhostPattern {
                pattern: source.clone(),
                source: e,
            }
        })?;
        Ok(Self { source, regex })
    }

    /// Returns true if the normalized host matches the whole pattern.
    pub fn matches(&self, host: &str) -> bool {
        self.regex.is_match(host)
    }

    /// The pattern as written in the configuration; doubles as the vhost key.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
