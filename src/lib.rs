//! Virtual-host HTTP reverse proxy library.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;

pub use config::schema::ProxyConfig;
pub use error::{CompileError, ProxyError};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::{Hook, HookResponse, RouteTable, VhostConfig};
