//! Global request and response filters.
//!
//! The pre-filter runs before vhost resolution and may change the URL or
//! headers. The post-filter sees the backend response head before it is
//! relayed to the client.

use std::sync::Arc;

use axum::http::{header, response, HeaderValue};

use crate::config::schema::{FilterConfig, PostFilterConfig, PreFilterConfig};
use crate::http::request::RequestContext;

/// Runs on every request before routing. `vhost` is the normalized Host.
pub trait PreFilter: Send + Sync {
    fn apply(&self, request: &mut RequestContext, vhost: &str);
}

/// Runs on every backend response head before it reaches the client.
pub trait PostFilter: Send + Sync {
    fn apply(&self, response: &mut response::Parts, request: &RequestContext, vhost: &str);
}

impl<F> PreFilter for F
where
    F: Fn(&mut RequestContext, &str) + Send + Sync,
{
    fn apply(&self, request: &mut RequestContext, vhost: &str) {
        self(request, vhost)
    }
}

impl<F> PostFilter for F
where
    F: Fn(&mut response::Parts, &RequestContext, &str) + Send + Sync,
{
    fn apply(&self, response: &mut response::Parts, request: &RequestContext, vhost: &str) {
        self(response, request, vhost)
    }
}

/// The configured filter pair.
#[derive(Clone, Default)]
pub struct Filters {
    pub pre: Option<Arc<dyn PreFilter>>,
    pub post: Option<Arc<dyn PostFilter>>,
}

impl Filters {
    pub fn from_config(config: &FilterConfig) -> Self {
        let pre = config.pre.as_ref().map(|pre| match pre {
            PreFilterConfig::CollapseSlashes => Arc::new(CollapseSlashes) as Arc<dyn PreFilter>,
        });
        let post = config.post.as_ref().map(|post| match post {
            PostFilterConfig::AppendServer { token } => {
                Arc::new(AppendServer::new(token.clone())) as Arc<dyn PostFilter>
            }
        });
        Self { pre, post }
    }
}

/// Reduces a run of leading slashes in the URL to one.
#[derive(Debug, Clone, Copy)]
pub struct CollapseSlashes;

impl PreFilter for CollapseSlashes {
    fn apply(&self, request: &mut RequestContext, _vhost: &str) {
        if request.url().starts_with("//") {
            let collapsed = format!("/{}", request.url().trim_start_matches('/'));
            request.set_url(collapsed);
        }
    }
}

/// Appends a token to the backend's `Server` header.
#[derive(Debug, Clone)]
pub struct AppendServer {
    token: String,
}

impl AppendServer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

impl PostFilter for AppendServer {
    fn apply(&self, response: &mut response::Parts, _request: &RequestContext, _vhost: &str) {
        let value = match response.headers.get(header::SERVER) {
            Some(server) => {
                let mut bytes = server.as_bytes().to_vec();
                bytes.extend_from_slice(b"; ");
                bytes.extend_from_slice(self.token.as_bytes());
                HeaderValue::from_bytes(&bytes)
            }
            None => HeaderValue::from_str(&self.token),
        };
        match value {
            Ok(value) => {
                response.headers.insert(header::SERVER, value);
            }
            Err(e) => tracing::warn!(token = %self.token, error = %e, "Cannot append server token"),
        }
    }
}
