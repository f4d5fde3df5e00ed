//! URL-bound hooks.
//!
//! A hook is a callback bound to a URL pattern. Every hook whose pattern
//! matches the current URL runs, in declaration order; a hook returning `true`
//! claims the request, and once all matching hooks have run a claimed request
//! is answered from the [`HookResponse`] instead of being proxied.
//!
//! Hooks only see the request they were invoked for: a mutable
//! [`RequestContext`] and that request's [`HookResponse`].

use std::net::IpAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Response, StatusCode},
};
use regex::Regex;

use crate::config::schema::HookAction;
use crate::http::request::RequestContext;

/// A request hook.
///
/// Returns `true` when the request is fully handled and must not be proxied.
pub trait Hook: Send + Sync {
    fn call(&self, request: &mut RequestContext, response: &mut HookResponse) -> bool;
}

impl<F> Hook for F
where
    F: Fn(&mut RequestContext, &mut HookResponse) -> bool + Send + Sync,
{
    fn call(&self, request: &mut RequestContext, response: &mut HookResponse) -> bool {
        self(request, response)
    }
}

/// The response a hook writes into.
///
/// Status defaults to 200. Writes accumulate; the response is only sent if
/// some hook claims the request.
#[derive(Debug, Default)]
pub struct HookResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl HookResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&mut self, status: StatusCode) -> &mut Self {
        self.status = Some(status);
        self
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        self.body.extend_from_slice(chunk.as_ref());
        self
    }

    /// Whether any hook has touched this response.
    pub fn is_written(&self) -> bool {
        self.status.is_some() || !self.headers.is_empty() || !self.body.is_empty()
    }

    pub fn into_response(self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// A hook bound to an unanchored URL pattern.
#[derive(Clone)]
pub struct HookBinding {
    pattern: Regex,
    hook: Arc<dyn Hook>,
}

impl HookBinding {
    pub fn new(pattern: &str, hook: Arc<dyn Hook>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            hook,
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

impl std::fmt::Debug for HookBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookBinding")
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

/// Run every hook whose pattern matches the request's current URL.
///
/// Returns the response to send when at least one hook claimed the request.
pub fn dispatch(bindings: &[HookBinding], request: &mut RequestContext) -> Option<Response<Body>> {
    let mut response = HookResponse::new();
    let mut handled = false;

    for binding in bindings {
        if !binding.pattern.is_match(request.url()) {
            continue;
        }
        let claimed = binding.hook.call(request, &mut response);
        tracing::debug!(
            vhost = %request.vhost(),
            hook = %binding.pattern(),
            url = %request.url(),
            claimed,
            "Hook invoked"
        );
        handled |= claimed;
    }

    if handled {
        Some(response.into_response())
    } else {
        if response.is_written() {
            tracing::warn!(
                vhost = %request.vhost(),
                url = %request.url(),
                "Hook wrote a response without claiming the request; discarding it"
            );
        }
        None
    }
}

/// Lets listed client addresses through; everyone else gets a 403.
#[derive(Debug, Clone)]
pub struct AllowList {
    addresses: Vec<IpAddr>,
}

impl AllowList {
    pub fn new(addresses: Vec<IpAddr>) -> Self {
        Self { addresses }
    }

    fn allows(&self, ip: IpAddr) -> bool {
        let ip = match ip {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(ip),
            v4 => v4,
        };
        self.addresses.contains(&ip)
    }
}

impl Hook for AllowList {
    fn call(&self, request: &mut RequestContext, response: &mut HookResponse) -> bool {
        let remote = request.remote_addr().ip();
        if self.allows(remote) {
            return false;
        }

        tracing::info!(remote = %remote, url = %request.url(), "Denied by allow list");
        response
            .status(StatusCode::FORBIDDEN)
            .write(format!("{} denied to {}", request.url(), remote));
        true
    }
}

/// Answers every matching request with a fixed response.
#[derive(Debug, Clone)]
pub struct StaticResponse {
    status: StatusCode,
    content_type: Option<HeaderValue>,
    body: String,
}

impl StaticResponse {
    pub fn new(status: StatusCode, content_type: Option<HeaderValue>, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }
}

impl Hook for StaticResponse {
    fn call(&self, _request: &mut RequestContext, response: &mut HookResponse) -> bool {
        response.status(self.status);
        if let Some(content_type) = &self.content_type {
            response.header(header::CONTENT_TYPE, content_type.clone());
        }
        response.write(&self.body);
        true
    }
}

/// Build the hook for a configured action.
pub fn from_action(action: &HookAction) -> Arc<dyn Hook> {
    match action {
        HookAction::Allow { addresses } => Arc::new(AllowList::new(addresses.clone())),
        HookAction::Respond {
            status,
            content_type,
            body,
        } => {
            let status = StatusCode::from_u16(*status).unwrap_or(StatusCode::OK);
            let content_type = content_type
                .as_deref()
                .and_then(|ct| HeaderValue::from_str(ct).ok());
            Arc::new(StaticResponse::new(status, content_type, body.clone()))
        }
    }
}
