//! Backend forwarding.
//!
//! # Responsibilities
//! - Open a connection to the vhost's backend and send the request
//! - Add `X-Forwarded-For` and tag the `User-Agent`
//! - Run the post-filter on the backend response head
//! - Stream the response body back (none for 304)
//!
//! # Design Decisions
//! - Request and response bodies stream; nothing is buffered in full
//! - No retries and no timeouts at this layer
//! - Idle pooling is configurable and off by default

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response, StatusCode, Uri},
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::ForwardingConfig;
use crate::error::ProxyError;
use crate::http::filters::PostFilter;
use crate::http::request::RequestContext;
use crate::http::response::normalize_connection;
use crate::routing::VhostConfig;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Forwards requests to backends over HTTP/1.1.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    user_agent_token: String,
}

impl Forwarder {
    pub fn new(config: &ForwardingConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build(HttpConnector::new());

        Self {
            client,
            user_agent_token: config.user_agent_token.clone(),
        }
    }

    /// Forward the request described by `ctx` with `body` to the vhost's
    /// backend and return the response to relay.
    pub async fn forward(
        &self,
        ctx: &RequestContext,
        vhost: &VhostConfig,
        body: Body,
        post: Option<&dyn PostFilter>,
    ) -> Result<Response<Body>, ProxyError> {
        let port = vhost.port().ok_or_else(|| ProxyError::MissingBackend {
            vhost: vhost.key().to_string(),
        })?;
        let host = vhost.host();

        let uri = backend_uri(host, port, ctx.url()).ok_or_else(|| ProxyError::InvalidTarget {
            vhost: vhost.key().to_string(),
            target: ctx.url().to_string(),
        })?;

        let mut request = Request::new(body);
        *request.method_mut() = ctx.method().clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = ctx.headers().clone();
        self.add_forwarding_headers(&mut request, ctx);

        tracing::debug!(
            vhost = %vhost.key(),
            host = %host,
            port,
            url = %ctx.url(),
            "Forwarding request"
        );

        let response = self.client.request(request).await.map_err(|e| {
            tracing::warn!(
                vhost = %vhost.key(),
                host = %host,
                port,
                error = %e,
                "Request for vhost failed - back-end server unreachable"
            );
            ProxyError::BackendUnreachable {
                vhost: vhost.key().to_string(),
                host: host.to_string(),
                port,
                source: e,
            }
        })?;

        let (mut parts, incoming) = response.into_parts();

        if let Some(filter) = post {
            filter.apply(&mut parts, ctx, vhost.key());
        }
        normalize_connection(&mut parts.headers, ctx.headers().get(header::CONNECTION));

        if parts.status == StatusCode::NOT_MODIFIED {
            return Ok(Response::from_parts(parts, Body::empty()));
        }
        Ok(Response::from_parts(parts, Body::new(incoming)))
    }

    fn add_forwarding_headers(&self, request: &mut Request<Body>, ctx: &RequestContext) {
        let headers = request.headers_mut();

        if let Ok(ip) = HeaderValue::from_str(&ctx.remote_addr().ip().to_string()) {
            headers.insert(X_FORWARDED_FOR, ip);
        }

        let agent = match headers.get(header::USER_AGENT) {
            Some(existing) => {
                let mut bytes = existing.as_bytes().to_vec();
                bytes.extend_from_slice(b"; ");
                bytes.extend_from_slice(self.user_agent_token.as_bytes());
                HeaderValue::from_bytes(&bytes)
            }
            None => HeaderValue::from_str(&self.user_agent_token),
        };
        if let Ok(agent) = agent {
            headers.insert(header::USER_AGENT, agent);
        }
    }
}

/// Absolute URI for the backend request; `None` if the URL cannot be used
/// as a request target.
fn backend_uri(host: &str, port: u16, url: &str) -> Option<Uri> {
    let authority = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    };
    let slash = if url.starts_with('/') { "" } else { "/" };

    format!("http://{}{}{}", authority, slash, url).parse().ok()
}
