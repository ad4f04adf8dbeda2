//! Front controller: the single handler behind every path.
//!
//! Order of decisions for one request:
//! 1. `OPTIONS` is answered locally with an empty 200
//! 2. WebSocket upgrades go to the multiplayer relay when one is configured
//! 3. The route table picks a backend, or the request gets a 404
//! 4. Body-bearing methods have their body buffered in full
//! 5. The request is admitted to the queue and the caller waits for its turn
//!
//! Static headers are added by middleware, not here.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::{Request, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::error::ProxyError;
use crate::http::request::is_websocket_upgrade;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::proxy::forwarder::is_body_bearing;
use crate::proxy::OutboundRequest;

/// Route label used for requests that matched nothing.
const UNMATCHED: &str = "none";

pub async fn front_controller(State(state): State<AppState>, request: Request) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    if method == Method::OPTIONS {
        metrics::record_request(method.as_str(), 200, UNMATCHED, start);
        return StatusCode::OK.into_response();
    }

    if let Some(relay) = &state.multiplayer {
        if is_websocket_upgrade(request.headers()) {
            return relay.upgrade(request).await;
        }
    }

    let path = request.uri().path().to_string();
    let route = match state.routes.resolve(&path, request.uri().query()) {
        Ok(Some(route)) => route,
        Ok(None) => {
            tracing::debug!(method = %method, path = %path, "No route matched");
            metrics::record_request(method.as_str(), 404, UNMATCHED, start);
            return ProxyError::RouteNotFound(path).into_response();
        }
        Err(e) => {
            tracing::error!(method = %method, path = %path, error = %e, "Backend target rejected");
            metrics::record_request(method.as_str(), 500, UNMATCHED, start);
            return e.into_response();
        }
    };

    let response = match forward(&state, route.name.clone(), route.target, route.rewrite_host, request).await {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                method = %method,
                path = %path,
                route = %route.name,
                error = %e,
                error_type = e.error_type(),
                "Request failed"
            );
            e.into_response()
        }
    };

    metrics::record_request(method.as_str(), response.status().as_u16(), &route.name, start);
    response
}

async fn forward(
    state: &AppState,
    route: std::sync::Arc<str>,
    target: Uri,
    rewrite_host: bool,
    request: Request,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();

    let body = if is_body_bearing(&parts.method) {
        read_body(body, state.max_body_bytes).await?
    } else {
        Bytes::new()
    };

    tracing::debug!(route = %route, target = %target, method = %parts.method, "Admitting request");

    let ticket = state.queue.enqueue(
        route,
        OutboundRequest {
            method: parts.method,
            target,
            headers: parts.headers,
            body,
            rewrite_host,
        },
    )?;

    ticket.response().await
}

async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| ProxyError::RequestBody(e.to_string()))
}
