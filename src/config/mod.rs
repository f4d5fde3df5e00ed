//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated)
//!     → routing::RouteTable::compile (regexes compiled once)
//!     → shared via Arc with every listener
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    FilterConfig, ForwardingConfig, HookAction, HookEntry, ListenerConfig, ObservabilityConfig,
    PortValue, PostFilterConfig, PreFilterConfig, ProxyConfig, RuleEntry, VhostEntry,
};
