//! Per-request pipeline.
//!
//! ```text
//! pre-filter → resolve vhost → rewrite → hooks → forward (→ post-filter)
//!                  │              │         │        │
//!                 500            301    hook reply  500/503
//! ```
//!
//! Each stage either hands the request on or produces the final response.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{request, Response},
    response::IntoResponse,
};

use crate::config::ForwardingConfig;
use crate::error::ProxyError;
use crate::http::filters::Filters;
use crate::http::forward::Forwarder;
use crate::http::request::RequestContext;
use crate::http::response;
use crate::routing::{hooks, rewrite, RouteTable, Rewritten};

/// The routing pipeline shared by every listener.
pub struct Pipeline {
    routes: Arc<RouteTable>,
    filters: Filters,
    forwarder: Forwarder,
}

impl Pipeline {
    pub fn new(routes: Arc<RouteTable>, filters: Filters, forwarding: &ForwardingConfig) -> Self {
        Self {
            routes,
            filters,
            forwarder: Forwarder::new(forwarding),
        }
    }

    /// Run one request through every stage.
    pub async fn handle(&self, parts: request::Parts, body: Body, remote_addr: SocketAddr) -> Response<Body> {
        let mut ctx = RequestContext::from_parts(&parts, remote_addr);

        tracing::debug!(
            host = %ctx.original_host(),
            url = %ctx.url(),
            remote = %remote_addr,
            "Request received"
        );

        if ctx.url().starts_with("//") {
            tracing::warn!(
                host = %ctx.original_host(),
                url = %ctx.url(),
                remote = %remote_addr,
                "Request for bogus URL"
            );
            let trimmed = ctx.url()[1..].to_string();
            ctx.set_url(trimmed);
        }

        if let Some(pre) = &self.filters.pre {
            let host = ctx.original_host().to_string();
            pre.apply(&mut ctx, &host);
        }

        let vhost = match self.routes.resolve(ctx.original_host()) {
            Ok(vhost) => vhost,
            Err(e) => {
                tracing::warn!(error = %e, remote = %remote_addr, "No vhost matched");
                return e.into_response();
            }
        };
        ctx.bind_vhost(vhost.key());

        match rewrite(vhost.rules(), ctx.url()) {
            Rewritten::Redirect(target) => {
                return response::redirect(vhost.key(), &target)
                    .unwrap_or_else(IntoResponse::into_response);
            }
            Rewritten::Url(url) => ctx.set_url(url),
        }

        if let Some(reply) = hooks::dispatch(vhost.hooks(), &mut ctx) {
            return reply;
        }

        let post = self.filters.post.as_deref();
        match self.forwarder.forward(&ctx, vhost, body, post).await {
            Ok(response) => response,
            Err(e) => {
                if !matches!(e, ProxyError::BackendUnreachable { .. }) {
                    tracing::warn!(error = %e, "Cannot forward request");
                }
                e.into_response()
            }
        }
    }
}
