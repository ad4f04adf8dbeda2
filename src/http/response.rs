//! Response header injection.
//!
//! The static header set is applied to every response, including 404s,
//! 500s and `OPTIONS` replies. It counts as "set first": when a backend
//! response already carries a header of the same name, the backend's value
//! is kept.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::config::StaticHeaders;

/// Middleware adding the static headers to the outgoing response.
pub async fn apply_static_headers(
    State(headers): State<Arc<StaticHeaders>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    merge_static_headers(&headers, &mut response);
    response
}

/// Insert every static header the response does not already carry.
pub fn merge_static_headers(headers: &StaticHeaders, response: &mut Response) {
    let target = response.headers_mut();
    for (name, value) in headers.iter() {
        if !target.contains_key(name) {
            target.insert(name.clone(), value.clone());
        }
    }
}
