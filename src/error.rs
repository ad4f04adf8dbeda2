//! Gateway error types.
//!
//! Every failure the gateway can surface to a caller is one of these
//! variants. The mapping to HTTP is deliberately coarse: unmatched routes
//! become `404 not found`, everything else becomes an empty `500`.

use std::time::Duration;

use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Body returned for requests that match no route.
pub const NOT_FOUND_BODY: &str = "not found";

#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("no route for path {0}")]
    RouteNotFound(String),

    #[error("backend request failed: {0}")]
    BackendConnect(String),

    #[error("backend stream failed: {0}")]
    BackendStream(String),

    #[error("backend did not finish within {0:?}")]
    BackendTimeout(Duration),

    #[error("queue error: {0}")]
    QueueInternal(String),

    #[error("failed to read request body: {0}")]
    RequestBody(String),

    #[error("invalid backend target: {0}")]
    InvalidTarget(String),
}

impl ProxyError {
    /// Stable label used in logs and metrics.
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::RouteNotFound(_) => "route_not_found",
            Self::BackendConnect(_) => "backend_connect",
            Self::BackendStream(_) => "backend_stream",
            Self::BackendTimeout(_) => "backend_timeout",
            Self::QueueInternal(_) => "queue_internal",
            Self::RequestBody(_) => "request_body",
            Self::InvalidTarget(_) => "invalid_target",
        }
    }

    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::RouteNotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<hyper_util::client::legacy::Error> for ProxyError {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        match std::error::Error::source(&err) {
            Some(source) => Self::BackendConnect(format!("{}: {}", err, source)),
            None => Self::BackendConnect(err.to_string()),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self {
            Self::RouteNotFound(_) => Body::from(NOT_FOUND_BODY),
            _ => Body::empty(),
        };

        let mut response = Response::new(body);
        *response.status_mut() = status;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_not_found_is_404() {
        let response = ProxyError::RouteNotFound("/nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn backend_failures_are_500() {
        for err in [
            ProxyError::BackendConnect("refused".into()),
            ProxyError::BackendTimeout(Duration::from_secs(15)),
            ProxyError::QueueInternal("closed".into()),
            ProxyError::InvalidTarget("bad".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn error_type_labels() {
        assert_eq!(ProxyError::BackendTimeout(Duration::ZERO).error_type(), "backend_timeout");
        assert_eq!(ProxyError::RouteNotFound(String::new()).error_type(), "route_not_found");
    }
}
