//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.
//! Patterns are kept as source text here; [`crate::routing::RouteTable`]
//! compiles them.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the reverse proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (port and bind addresses).
    pub listener: ListenerConfig,

    /// Vhost used when the Host header matches no pattern.
    pub default_vhost: Option<String>,

    /// Virtual hosts, in declaration order.
    #[serde(rename = "vhost")]
    pub vhosts: Vec<VhostEntry>,

    /// Global request/response filters.
    pub filters: FilterConfig,

    /// Backend forwarding settings.
    pub forwarding: ForwardingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Port shared by every bind address.
    pub port: u16,

    /// Addresses to listen on; one listener is started per entry.
    pub bind: Vec<String>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            bind: vec!["127.0.0.1".to_string()],
        }
    }
}

/// A virtual host as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VhostEntry {
    /// Regular expression matched (anchored) against the normalized Host header.
    pub pattern: String,

    /// Backend host; `127.0.0.1` when absent.
    #[serde(default)]
    pub host: Option<String>,

    /// Backend port, required for proxying.
    #[serde(default)]
    pub port: Option<PortValue>,

    /// Rewrite rules, applied in order.
    #[serde(default, rename = "rule")]
    pub rules: Vec<RuleEntry>,

    /// Hooks bound to URL patterns, evaluated in order.
    #[serde(default, rename = "function")]
    pub functions: Vec<HookEntry>,
}

/// A port written either as a number or as a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// The port as a non-zero `u16`, if it is one.
    pub fn resolve(&self) -> Option<u16> {
        let port = match self {
            PortValue::Number(n) => u16::try_from(*n).ok()?,
            PortValue::Text(s) => s.trim().parse::<u16>().ok()?,
        };
        (port != 0).then_some(port)
    }
}

impl std::fmt::Display for PortValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortValue::Number(n) => write!(f, "{}", n),
            PortValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// A rewrite rule: regex pattern plus replacement template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleEntry {
    pub pattern: String,
    pub replacement: String,
}

/// A hook bound to a URL pattern.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HookEntry {
    /// Regular expression searched (unanchored) in the request URL.
    pub pattern: String,

    /// What the hook does when the pattern matches.
    pub action: HookAction,
}

/// Built-in hook behaviours available from the config file.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HookAction {
    /// Let listed client addresses through; answer everyone else with 403.
    Allow { addresses: Vec<IpAddr> },

    /// Answer the request directly.
    Respond {
        #[serde(default = "default_respond_status")]
        status: u16,
        #[serde(default)]
        content_type: Option<String>,
        #[serde(default)]
        body: String,
    },
}

fn default_respond_status() -> u16 {
    200
}

/// Global filters, both optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub pre: Option<PreFilterConfig>,
    pub post: Option<PostFilterConfig>,
}

/// Built-in pre-filters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PreFilterConfig {
    /// Reduce any run of leading slashes in the URL to a single one.
    CollapseSlashes,
}

/// Built-in post-filters.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PostFilterConfig {
    /// Append a token to the backend's `Server` header.
    AppendServer {
        #[serde(default = "default_token")]
        token: String,
    },
}

/// Backend forwarding settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Token appended to the client's `User-Agent`.
    pub user_agent_token: String,

    /// Idle backend connections kept per host (0 = new connection per request).
    pub pool_max_idle_per_host: usize,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            user_agent_token: default_token(),
            pool_max_idle_per_host: 0,
        }
    }
}

fn default_token() -> String {
    "vhost-proxy".to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
