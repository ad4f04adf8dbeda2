//! HTTP server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the front controller behind every path
//! - Wire up middleware (panic containment, static headers, tracing)
//! - Start the admission queue worker
//! - Serve on a plain TCP listener or over TLS, with graceful shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

use crate::config::{GatewayConfig, StaticHeaders};
use crate::error::ProxyError;
use crate::http::controller::front_controller;
use crate::http::response::apply_static_headers;
use crate::http::websocket::MultiplayerRelay;
use crate::lifecycle::shutdown::{self, Shutdown};
use crate::proxy::{Dispatch, Forwarder};
use crate::queue::AdmissionQueue;
use crate::routing::RouteTable;

/// Connect timeout for backend connections. The job budget still bounds
/// the whole exchange.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Grace period for in-flight TLS connections after shutdown.
const TLS_DRAIN: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub queue: AdmissionQueue,
    pub max_body_bytes: usize,
    pub multiplayer: Option<Arc<MultiplayerRelay>>,
}

/// HTTP front end of the gateway.
pub struct GatewayServer {
    router: Router,
}

impl GatewayServer {
    /// Build a server that forwards over HTTP(S) with the pooled client.
    pub fn new(config: &GatewayConfig, headers: StaticHeaders, shutdown: &Shutdown) -> Result<Self, ProxyError> {
        let forwarder = Forwarder::new(CONNECT_TIMEOUT);
        Self::with_dispatcher(config, headers, Arc::new(forwarder), shutdown)
    }

    /// Build a server around an arbitrary dispatcher.
    pub fn with_dispatcher(
        config: &GatewayConfig,
        headers: StaticHeaders,
        dispatcher: Arc<dyn Dispatch>,
        shutdown: &Shutdown,
    ) -> Result<Self, ProxyError> {
        let routes = Arc::new(RouteTable::from_config(&config.routes)?);
        if routes.is_empty() {
            tracing::warn!("No routes configured; every request will be answered with 404");
        }
        let queue = AdmissionQueue::start(
            Duration::from_secs(config.queue.job_timeout_secs),
            dispatcher,
            shutdown.subscribe(),
        );

        let multiplayer = config.multiplayer.url.as_deref().and_then(|url| match MultiplayerRelay::new(url) {
            Ok(relay) => Some(Arc::new(relay)),
            Err(e) => {
                tracing::warn!(error = %e, "Multiplayer relay disabled");
                None
            }
        });

        let state = AppState {
            routes,
            queue,
            max_body_bytes: config.queue.max_body_bytes,
            multiplayer,
        };

        tracing::info!(
            routes = state.routes.len(),
            static_headers = headers.len(),
            job_timeout_secs = config.queue.job_timeout_secs,
            multiplayer = state.multiplayer.is_some(),
            "Gateway configured"
        );

        let router = Self::build_router(state, Arc::new(headers));
        Ok(Self { router })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers wrap outward in declaration order, so panics are turned into
    /// responses before static headers are added.
    fn build_router(state: AppState, headers: Arc<StaticHeaders>) -> Router {
        Router::new()
            .route("/", any(front_controller))
            .route("/{*path}", any(front_controller))
            .with_state(state)
            .layer(CatchPanicLayer::custom(panic_response))
            .layer(middleware::from_fn_with_state(headers, apply_static_headers))
            .layer(TraceLayer::new_for_http())
    }

    /// The router, for serving in-process (tests, embedding).
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown_rx: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown_rx))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Serve TLS on `addr` until `shutdown` fires.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        tls: RustlsConfig,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let handle = axum_server::Handle::new();

        let drain = handle.clone();
        tokio::spawn(async move {
            shutdown::wait(shutdown_rx).await;
            drain.graceful_shutdown(Some(TLS_DRAIN));
        });

        tracing::info!(address = %addr, "HTTPS server starting");
        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(self.router.into_make_service())
            .await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }
}

/// A panicking handler yields an empty 500; the server keeps running.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Request handler panicked");
    StatusCode::INTERNAL_SERVER_ERROR.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{HeaderName, HeaderValue, Method, Request};
    use futures_util::future::{BoxFuture, FutureExt};
    use tower::ServiceExt;

    use crate::proxy::OutboundRequest;

    /// Answers every request with 200 and the target URL as the body.
    struct EchoTarget;

    impl Dispatch for EchoTarget {
        fn dispatch(&self, request: OutboundRequest) -> BoxFuture<'static, Result<Response<Body>, ProxyError>> {
            async move {
                Ok(Response::builder()
                    .header("x-backend", "echo")
                    .body(Body::from(request.target.to_string()))
                    .unwrap_or_default())
            }
            .boxed()
        }
    }

    /// The `Shutdown` must outlive the test: dropping it stops the worker.
    fn server() -> (GatewayServer, Shutdown) {
        let headers = StaticHeaders::new(vec![(
            HeaderName::from_static("access-control-allow-origin"),
            HeaderValue::from_static("*"),
        )]);
        let shutdown = Shutdown::new();
        let server =
            GatewayServer::with_dispatcher(&GatewayConfig::default(), headers, Arc::new(EchoTarget), &shutdown)
                .unwrap();
        (server, shutdown)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn options_is_empty_ok_with_static_headers() {
        let (server, _shutdown) = server();
        let response = server
            .router()
            .oneshot(Request::builder().method(Method::OPTIONS).uri("/api/ocr").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn unmatched_path_is_not_found() {
        let (server, _shutdown) = server();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        assert_eq!(body_string(response).await, "not found");
    }

    #[tokio::test]
    async fn matched_path_goes_through_the_queue() {
        let (server, _shutdown) = server();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/api/ocr/read?lang=en").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-backend"], "echo");
        assert!(body_string(response).await.ends_with("/ocr/read?lang=en"));
    }

    #[test]
    fn panic_response_is_empty_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
