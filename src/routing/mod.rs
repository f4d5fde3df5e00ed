//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (Host header, URL)
//!     → matcher.rs (normalize host, anchored vhost patterns)
//!     → router.rs (full-table scan, last match wins, default-vhost retry)
//!     → rewrite.rs (ordered rules: rewrite, stop, or redirect)
//!     → hooks.rs (URL-bound callbacks that may answer the request)
//!
//! Route Compilation (at startup):
//!     VhostEntry[]
//!     → Compile vhost, rule and hook regexes
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Declaration order is significant for vhosts, rules and hooks

pub mod hooks;
pub mod matcher;
pub mod rewrite;
pub mod router;

pub use hooks::{Hook, HookResponse};
pub use rewrite::{rewrite, Rewritten};
pub use router::{RouteTable, VhostConfig};
