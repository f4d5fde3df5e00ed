//! Error types for route compilation and request handling.
//!
//! # Taxonomy
//! - [`CompileError`]: a pattern in the route table failed to compile. Fatal at
//!   startup, before any listener accepts connections.
//! - [`ProxyError`]: a per-request failure. Always converted into an HTTP
//!   response by the pipeline; the server keeps serving.
//!
//! Hook and filter panics are not represented here; they are caught by the
//! panic boundary installed in [`crate::http::server`].

use axum::{
    body::Body,
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use thiserror::Error;

/// A route table entry that could not be compiled.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("invalid vhost pattern `{pattern}`: {source}")]
    VhostPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid rewrite pattern `{pattern}` in vhost `{vhost}`: {source}")]
    RewritePattern {
        vhost: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid hook pattern `{pattern}` in vhost `{vhost}`: {source}")]
    HookPattern {
        vhost: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid backend port `{port}` in vhost `{vhost}`")]
    BackendPort { vhost: String, port: String },
}

/// A failure while handling a single request.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// No configured pattern matched the Host header, even after the
    /// default-vhost retry.
    #[error("no virtual host matches `{host}`")]
    VhostNotFound { host: String },

    /// The vhost resolved but has no backend port to proxy to.
    #[error("virtual host `{vhost}` has no backend port")]
    MissingBackend { vhost: String },

    /// A rewritten URL (or redirect target) is not a valid request target.
    #[error("rewritten target `{target}` for vhost `{vhost}` is not a valid URI")]
    InvalidTarget { vhost: String, target: String },

    /// Connecting to, or talking to, the backend failed before a response
    /// head arrived.
    #[error("back-end server {host}:{port} for `{vhost}` unreachable: {source}")]
    BackendUnreachable {
        vhost: String,
        host: String,
        port: u16,
        #[source]
        source: hyper_util::client::legacy::Error,
    },
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::VhostNotFound { .. }
            | ProxyError::MissingBackend { .. }
            | ProxyError::InvalidTarget { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::BackendUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn body(&self) -> String {
        match self {
            ProxyError::VhostNotFound { host } => host_details_missing(host),
            ProxyError::MissingBackend { vhost } => host_details_missing(vhost),
            ProxyError::InvalidTarget { .. } => "Invalid rewrite target.".to_string(),
            ProxyError::BackendUnreachable { .. } => "Back-end unreachable.".to_string(),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let mut response = Response::new(Body::from(self.body()));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/html"),
        );
        response
    }
}

/// Diagnostic body naming the vhost, escaped so it is safe inside HTML.
fn host_details_missing(vhost: &str) -> String {
    format!("Error finding host details for virtual host <tt>{}</tt>", escape(vhost))
}

/// Percent-encode everything outside `A-Za-z0-9@*_+-./`.
fn escape(text: &str) -> String {
    // form encoding leaves `*-._` alone and writes a space as `+`.
    url::form_urlencoded::byte_serialize(text.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
        .replace("%2B", "+")
        .replace("%2F", "/")
        .replace("%40", "@")
}
