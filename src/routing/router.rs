//! Route table and vhost resolution.
//!
//! # Responsibilities
//! - Compile vhost entries (patterns, rules, hooks) once at startup
//! - Resolve a Host header to a vhost, with default-vhost fallback
//! - Render the compiled table for `--dump`
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan of every vhost per request; the LAST matching entry wins
//! - Explicit `VhostNotFound` rather than silent default

use std::fmt;
use std::sync::Arc;

use crate::config::schema::VhostEntry;
use crate::error::{CompileError, ProxyError};
use crate::routing::hooks::{self, Hook, HookBinding};
use crate::routing::matcher::VhostPattern;
use crate::routing::rewrite::RewriteRule;

/// Backend host used when a vhost does not name one.
pub const DEFAULT_BACKEND_HOST: &str = "127.0.0.1";

/// A compiled virtual host.
#[derive(Debug, Clone)]
pub struct VhostConfig {
    pattern: VhostPattern,
    host: String,
    port: Option<u16>,
    rules: Vec<RewriteRule>,
    hooks: Vec<HookBinding>,
}

impl VhostConfig {
    /// A vhost with no backend port, rules or hooks.
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Ok(Self {
            pattern: VhostPattern::compile(pattern)?,
            host: DEFAULT_BACKEND_HOST.to_string(),
            port: None,
            rules: Vec::new(),
            hooks: Vec::new(),
        })
    }

    /// Compile a vhost from its config entry.
    pub fn from_entry(entry: &VhostEntry) -> Result<Self, CompileError> {
        let mut vhost = Self::new(&entry.pattern)?;

        if let Some(host) = &entry.host {
            vhost.host = host.clone();
        }
        if let Some(port) = &entry.port {
            vhost.port = Some(port.resolve().ok_or_else(|| CompileError::BackendPort {
                vhost: entry.pattern.clone(),
                port: port.to_string(),
            })?);
        }
        for rule in &entry.rules {
            vhost = vhost.rule(&rule.pattern, &rule.replacement)?;
        }
        for function in &entry.functions {
            vhost = vhost.hook_arc(&function.pattern, hooks::from_action(&function.action))?;
        }
        Ok(vhost)
    }

    /// Set the backend to proxy to.
    pub fn backend(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = Some(port);
        self
    }

    /// Append a rewrite rule.
    pub fn rule(mut self, pattern: &str, replacement: &str) -> Result<Self, CompileError> {
        let rule = RewriteRule::compile(pattern, replacement).map_err(|e| {
            CompileError::RewritePattern {
                vhost: self.key().to_string(),
                pattern: pattern.to_string(),
                source: e,
            }
        })?;
        self.rules.push(rule);
        Ok(self)
    }

    /// Append a hook bound to a URL pattern.
    pub fn hook<H: Hook + 'static>(self, pattern: &str, hook: H) -> Result<Self, CompileError> {
        self.hook_arc(pattern, Arc::new(hook))
    }

    fn hook_arc(mut self, pattern: &str, hook: Arc<dyn Hook>) -> Result<Self, CompileError> {
        let binding = HookBinding::new(pattern, hook).map_err(|e| CompileError::HookPattern {
            vhost: self.key().to_string(),
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.hooks.push(binding);
        Ok(self)
    }

    /// The vhost key: its pattern as written.
    pub fn key(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, host: &str) -> bool {
        self.pattern.matches(host)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn hooks(&self) -> &[HookBinding] {
        &self.hooks
    }
}

/// Ordered, immutable set of vhosts.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    vhosts: Vec<VhostConfig>,
    default_vhost: Option<String>,
}

impl RouteTable {
    pub fn new(vhosts: Vec<VhostConfig>, default_vhost: Option<String>) -> Self {
        Self {
            vhosts,
            default_vhost: default_vhost.map(|d| d.to_ascii_lowercase()),
        }
    }

    /// Compile every configured vhost, failing on the first bad pattern.
    pub fn compile(entries: &[VhostEntry], default_vhost: Option<&str>) -> Result<Self, CompileError> {
        let vhosts = entries
            .iter()
            .map(VhostConfig::from_entry)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(vhosts = vhosts.len(), "Route table compiled");
        Ok(Self::new(vhosts, default_vhost.map(str::to_string)))
    }

    /// Resolve a normalized host to its vhost.
    ///
    /// Every entry is tested and the last match wins. If nothing matches, the
    /// same pass is repeated with the default vhost name.
    pub fn resolve(&self, host: &str) -> Result<&VhostConfig, ProxyError> {
        if let Some(vhost) = self.last_match(host) {
            return Ok(vhost);
        }

        if let Some(fallback) = &self.default_vhost {
            if let Some(vhost) = self.last_match(fallback) {
                tracing::debug!(host = %host, default_vhost = %fallback, "Using default vhost");
                return Ok(vhost);
            }
        }

        Err(ProxyError::VhostNotFound {
            host: host.to_string(),
        })
    }

    fn last_match(&self, host: &str) -> Option<&VhostConfig> {
        let mut chosen = None;
        for vhost in &self.vhosts {
            if vhost.matches(host) {
                chosen = Some(vhost);
            }
        }
        chosen
    }

    pub fn vhosts(&self) -> &[VhostConfig] {
        &self.vhosts
    }

    pub fn default_vhost(&self) -> Option<&str> {
        self.default_vhost.as_deref()
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for vhost in &self.vhosts {
            writeln!(f, "http://{}/", vhost.key())?;
            for rule in &vhost.rules {
                writeln!(f, "\tRewriting {} to {}", rule.pattern(), rule.replacement())?;
            }
            for hook in &vhost.hooks {
                writeln!(f, "\tHook on {}", hook.pattern())?;
            }
            if let Some(port) = vhost.port {
                writeln!(f, "\tproxying to {}:{}", vhost.host, port)?;
            }
        }
        if let Some(default) = self.default_vhost() {
            writeln!(f, "default vhost: {}", default)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{PortValue, RuleEntry};

    fn table(patterns: &[(&str, u16)], default_vhost: Option<&str>) -> RouteTable {
        let vhosts = patterns
            .iter()
            .map(|(p, port)| VhostConfig::new(p).unwrap().backend("127.0.0.1", *port))
            .collect();
        RouteTable::new(vhosts, default_vhost.map(str::to_string))
    }

    #[test]
    fn last_matching_entry_wins() {
        let routes = table(&[(".*", 1), ("example.com", 2), ("example\\.com|other", 3)], None);
        let vhost = routes.resolve("example.com").unwrap();
        assert_eq!(vhost.port(), Some(3));
        assert_eq!(vhost.key(), "example\\.com|other");

        assert_eq!(routes.resolve("unrelated.org").unwrap().port(), Some(1));
    }

    #[test]
    fn falls_back_to_default_vhost() {
        let routes = table(&[("example.com", 8080), ("example.org", 9090)], Some("Example.ORG"));
        assert_eq!(routes.default_vhost(), Some("example.org"));
        let vhost = routes.resolve("").unwrap();
        assert_eq!(vhost.key(), "example.org");
        assert_eq!(routes.resolve("nowhere.net").unwrap().port(), Some(9090));
    }

    #[test]
    fn unknown_host_without_default() {
        let routes = table(&[("example.com", 8080)], None);
        let err = routes.resolve("nowhere.net").unwrap_err();
        assert!(matches!(err, ProxyError::VhostNotFound { host } if host == "nowhere.net"));
    }

    #[test]
    fn unknown_default_vhost_is_not_found() {
        let routes = table(&[("example.com", 8080)], Some("missing.example"));
        assert!(routes.resolve("nowhere.net").is_err());
    }

    #[test]
    fn compiles_entries() {
        let entries = vec![VhostEntry {
            pattern: "www.example.com".into(),
            host: None,
            port: Some(PortValue::Text("8080".into())),
            rules: vec![RuleEntry {
                pattern: "^/(.*)".into(),
                replacement: "http://example.com/$1".into(),
            }],
            functions: Vec::new(),
        }];

        let routes = RouteTable::compile(&entries, None).unwrap();
        let vhost = &routes.vhosts()[0];
        assert_eq!(vhost.host(), DEFAULT_BACKEND_HOST);
        assert_eq!(vhost.port(), Some(8080));
        assert_eq!(vhost.rules().len(), 1);
    }

    #[test]
    fn bad_rule_is_compile_error() {
        let err = VhostConfig::new("example.com")
            .unwrap()
            .rule("([a-z", "/x")
            .unwrap_err();
        assert!(matches!(err, CompileError::RewritePattern { vhost, .. } if vhost == "example.com"));
    }

    #[test]
    fn dump_lists_vhosts() {
        let routes = RouteTable::new(
            vec![VhostConfig::new("example.com")
                .unwrap()
                .backend("10.0.0.2", 8080)
                .rule("^/(.*)", "/show.cgi?path=$1")
                .unwrap()],
            None,
        );
        assert_eq!(
            routes.to_string(),
            "http://example.com/\n\tRewriting ^/(.*) to /show.cgi?path=$1\n\tproxying to 10.0.0.2:8080\n"
        );
    }
}
