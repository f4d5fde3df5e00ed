//! Response construction and transformation.
//!
//! # Responsibilities
//! - Build redirect responses for absolute rewrite targets
//! - Normalize the `Connection` header on relayed backend responses
//!
//! Error responses live with their causes in [`crate::error::ProxyError`].

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderValue, Response, StatusCode},
};

use crate::error::ProxyError;

/// A 301 to `target` with an empty body.
pub fn redirect(vhost: &str, target: &str) -> Result<Response<Body>, ProxyError> {
    let location = HeaderValue::from_str(target).map_err(|_| ProxyError::InvalidTarget {
        vhost: vhost.to_string(),
        target: target.to_string(),
    })?;

    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;
    response.headers_mut().insert(header::LOCATION, location);
    Ok(response)
}

/// If the backend sent a `Connection` header, replace it with the client's
/// value, or `close` when the client sent none.
pub fn normalize_connection(backend: &mut HeaderMap, client: Option<&HeaderValue>) {
    if !backend.contains_key(header::CONNECTION) {
        return;
    }
    let value = client
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("close"));
    backend.insert(header::CONNECTION, value);
}
