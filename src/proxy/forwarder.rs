//! Outbound request construction and dispatch to a backend.
//!
//! # Responsibilities
//! - Copy inbound headers to the outbound request (dropping `Host` on request)
//! - Send the buffered body for `POST`/`PUT`/`DELETE`, nothing otherwise
//! - Hand back the backend response with its status and headers untouched
//!   and its body as a stream
//!
//! # Design Decisions
//! - No sanitization: cookies and auth headers pass through as-is
//! - Message framing headers are recomputed by the client from the body
//!   actually sent
//! - Redirects are relayed, never followed
//! - No decompression: encoded bodies pass through byte-for-byte
//! - The target URI is sent as given; paths are never normalized

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Response, Uri};
use futures_util::future::{BoxFuture, FutureExt};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::error::ProxyError;

/// A request ready to be sent to a backend.
#[derive(Debug)]
pub struct OutboundRequest {
    pub method: Method,
    /// Absolute backend URI (rewritten path and query included).
    pub target: Uri,
    /// Headers as received from the caller.
    pub headers: HeaderMap,
    /// Fully buffered inbound body.
    pub body: Bytes,
    /// Drop the caller's `Host` header.
    pub rewrite_host: bool,
}

/// Sends an outbound request and returns the backend's response head with a
/// streaming body.
///
/// The admission queue only depends on this trait, so the transport can be
/// swapped out (tests use in-process fakes).
pub trait Dispatch: Send + Sync + 'static {
    fn dispatch(&self, request: OutboundRequest) -> BoxFuture<'static, Result<Response<Body>, ProxyError>>;
}

/// Methods whose inbound body is forwarded.
pub fn is_body_bearing(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::DELETE)
}

/// Build the outbound header map from the inbound one.
pub fn outbound_headers(inbound: &HeaderMap, rewrite_host: bool) -> HeaderMap {
    let mut headers = inbound.clone();
    if rewrite_host {
        headers.remove(header::HOST);
    }
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::TRANSFER_ENCODING);
    headers
}

/// HTTP(S) forwarder backed by a pooled `hyper-util` client.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpsConnector<HttpConnector>, Body>,
}

impl Forwarder {
    /// Create a forwarder. `connect_timeout` bounds connection setup only;
    /// the overall budget belongs to the admission queue.
    pub fn new(connect_timeout: Duration) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(connect_timeout));

        let https = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http);

        let client = Client::builder(TokioExecutor::new()).build(https);
        Self { client }
    }

    /// Send one request to the backend and return its response.
    pub async fn forward(&self, request: OutboundRequest) -> Result<Response<Body>, ProxyError> {
        let OutboundRequest {
            method,
            target,
            headers,
            body,
            rewrite_host,
        } = request;

        let body = if is_body_bearing(&method) { body } else { Bytes::new() };

        tracing::debug!(
            method = %method,
            target = %target,
            body_bytes = body.len(),
            "Forwarding to backend"
        );

        let mut outbound = Request::new(Body::from(body));
        *outbound.method_mut() = method;
        *outbound.uri_mut() = target;
        *outbound.headers_mut() = outbound_headers(&headers, rewrite_host);

        let upstream = self.client.request(outbound).await?;
        Ok(upstream.map(Body::new))
    }
}

impl Dispatch for Forwarder {
    fn dispatch(&self, request: OutboundRequest) -> BoxFuture<'static, Result<Response<Body>, ProxyError>> {
        let forwarder = self.clone();
        async move { forwarder.forward(request).await }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example"));
        headers.insert(header::COOKIE, HeaderValue::from_static("session=abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer t"));
        headers.insert("x-custom", HeaderValue::from_static("1"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers
    }

    #[test]
    fn host_kept_without_rewrite() {
        let headers = outbound_headers(&inbound(), false);
        assert_eq!(headers.get(header::HOST).unwrap(), "gateway.example");
        assert_eq!(headers.get(header::COOKIE).unwrap(), "session=abc");
        assert_eq!(headers.get(header::AUTHORIZATION).unwrap(), "Bearer t");
        assert_eq!(headers.get("x-custom").unwrap(), "1");
    }

    #[test]
    fn host_dropped_with_rewrite() {
        let headers = outbound_headers(&inbound(), true);
        assert!(headers.get(header::HOST).is_none());
        assert_eq!(headers.get(header::COOKIE).unwrap(), "session=abc");
    }

    #[test]
    fn framing_headers_recomputed() {
        let headers = outbound_headers(&inbound(), false);
        assert!(headers.get(header::CONTENT_LENGTH).is_none());
    }

    #[test]
    fn body_bearing_methods() {
        assert!(is_body_bearing(&Method::POST));
        assert!(is_body_bearing(&Method::PUT));
        assert!(is_body_bearing(&Method::DELETE));
        assert!(!is_body_bearing(&Method::GET));
        assert!(!is_body_bearing(&Method::PATCH));
        assert!(!is_body_bearing(&Method::HEAD));
    }

    #[test]
    fn multi_valued_headers_survive() {
        let mut headers = HeaderMap::new();
        headers.append(header::ACCEPT, HeaderValue::from_static("image/png"));
        headers.append(header::ACCEPT, HeaderValue::from_static("image/jpeg"));

        let out = outbound_headers(&headers, true);
        let values: Vec<_> = out.get_all(header::ACCEPT).iter().collect();
        assert_eq!(values, vec!["image/png", "image/jpeg"]);
    }
}
