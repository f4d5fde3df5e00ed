//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the Axum router around the request pipeline
//! - Wire up middleware (request span, panic boundary)
//! - Serve one listener until shutdown is signalled

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, HeaderValue, Request, Response, StatusCode},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::config::{ForwardingConfig, ProxyConfig};
use crate::error::CompileError;
use crate::http::filters::Filters;
use crate::http::pipeline::Pipeline;
use crate::routing::RouteTable;

/// HTTP server for the vhost proxy.
#[derive(Clone)]
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Compile the route table and filters from `config`.
    pub fn new(config: &ProxyConfig) -> Result<Self, CompileError> {
        let routes = RouteTable::compile(&config.vhosts, config.default_vhost.as_deref())?;
        let filters = Filters::from_config(&config.filters);
        Ok(Self::with_routes(routes, filters, &config.forwarding))
    }

    /// Build a server around an already compiled route table. Embedders use
    /// this to register closure hooks and filters.
    pub fn with_routes(routes: RouteTable, filters: Filters, forwarding: &ForwardingConfig) -> Self {
        let pipeline = Arc::new(Pipeline::new(Arc::new(routes), filters, forwarding));
        Self {
            router: build_router(pipeline),
        }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve `listener` until a value arrives on `shutdown`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!(address = %addr, "HTTP server stopped");
        Ok(())
    }
}

fn build_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .with_state(pipeline)
        .layer(CatchPanicLayer::custom(hook_failure))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                request_id = %Uuid::new_v4(),
                method = %request.method(),
                uri = %request.uri(),
            )
        }))
}

/// Every request, whatever its path, goes through the pipeline.
async fn proxy_handler(
    State(pipeline): State<Arc<Pipeline>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    let (parts, body) = request.into_parts();
    pipeline.handle(parts, body, remote_addr).await
}

/// A hook or filter panicked. The request gets a 500 and the server keeps
/// serving.
fn hook_failure(err: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic"
    };
    tracing::error!(detail = %detail, "Hook failure while handling request");

    let mut response = Response::new(Body::from("Internal server error."));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::RequestContext;
    use crate::routing::{HookResponse, VhostConfig};
    use axum::extract::connect_info::MockConnectInfo;
    use tower::ServiceExt;

    #[tokio::test]
    async fn panicking_hook_becomes_500() {
        let vhost = VhostConfig::new("example\\.com")
            .unwrap()
            .hook("^/boom", |_: &mut RequestContext, _: &mut HookResponse| -> bool {
                panic!("hook exploded")
            })
            .unwrap();
        let server = HttpServer::with_routes(
            RouteTable::new(vec![vhost], None),
            Filters::default(),
            &ForwardingConfig::default(),
        );
        let app = server
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        let request = Request::builder()
            .uri("/boom")
            .header(header::HOST, "example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn every_path_reaches_pipeline() {
        let vhost = VhostConfig::new("example\\.com")
            .unwrap()
            .hook("", |req: &mut RequestContext, res: &mut HookResponse| {
                res.write(req.url().to_string());
                true
            })
            .unwrap();
        let server = HttpServer::with_routes(
            RouteTable::new(vec![vhost], None),
            Filters::default(),
            &ForwardingConfig::default(),
        );
        let app = server
            .router()
            .layer(MockConnectInfo(SocketAddr::from(([127, 0, 0, 1], 4000))));

        for path in ["/", "/a/b/c?d=e"] {
            let request = Request::builder()
                .uri(path)
                .header(header::HOST, "example.com")
                .body(Body::empty())
                .unwrap();
            let response = app.clone().oneshot(request).await.unwrap();
            let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
            assert_eq!(&body[..], path.as_bytes());
        }
    }
}
