//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request span, panic boundary)
//!     → request.rs (routing context from the request head)
//!     → pipeline.rs (filters, vhost, rewrite, hooks)
//!     → forward.rs (backend request, streamed response)
//!     → response.rs (redirects, Connection header)
//!     → Send to client
//! ```

pub mod filters;
pub mod forward;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use filters::{Filters, PostFilter, PreFilter};
pub use pipeline::Pipeline;
pub use request::RequestContext;
pub use server::HttpServer;
