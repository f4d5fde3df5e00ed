//! Per-request routing context.
//!
//! # Responsibilities
//! - Extract routing-relevant information (host, URL) from the request head
//! - Carry the mutable URL and headers through rewrite, hooks and filters
//! - Prepare request for forwarding to backend
//!
//! # Design Decisions
//! - The body is kept out of the context so it can stream straight through
//! - Original host and resolved vhost are read-only to hooks and filters

use std::net::SocketAddr;

use axum::http::{header, request, HeaderMap, Method};

use crate::routing::matcher::normalize_host;

/// Everything the pipeline knows about one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    original_host: String,
    vhost: String,
    method: Method,
    url: String,
    headers: HeaderMap,
    remote_addr: SocketAddr,
}

impl RequestContext {
    /// Build a context; the original host comes from the `Host` header.
    pub fn new(
        method: Method,
        url: impl Into<String>,
        headers: HeaderMap,
        remote_addr: SocketAddr,
    ) -> Self {
        let host = headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        let original_host = normalize_host(host);

        Self {
            original_host,
            vhost: String::new(),
            method,
            url: url.into(),
            headers,
            remote_addr,
        }
    }

    /// Build a context from a request head, falling back to the URI
    /// authority when no `Host` header was sent.
    pub fn from_parts(parts: &request::Parts, remote_addr: SocketAddr) -> Self {
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let mut ctx = Self::new(parts.method.clone(), url, parts.headers.clone(), remote_addr);

        if ctx.original_host.is_empty() {
            if let Some(authority) = parts.uri.authority() {
                ctx.original_host = normalize_host(authority.as_str());
            }
        }
        ctx
    }

    /// The Host header, lowercased and without its port.
    pub fn original_host(&self) -> &str {
        &self.original_host
    }

    /// The pattern of the vhost this request resolved to; empty before
    /// resolution.
    pub fn vhost(&self) -> &str {
        &self.vhost
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Current path and query.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub(crate) fn bind_vhost(&mut self, key: &str) {
        self.vhost = key.to_string();
    }
}
