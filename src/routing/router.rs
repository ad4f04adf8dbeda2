//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes in declaration order
//! - Resolve a request path to a backend URL or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (shared via `Arc`, no locks)
//! - O(n) prefix scan in declaration order; first match wins
//! - Explicit `None` rather than a silent default route

use std::sync::Arc;

use axum::http::uri::{Authority, Scheme as UriScheme};
use axum::http::Uri;

use crate::config::{RouteConfig, Scheme};
use crate::error::ProxyError;
use crate::routing::matcher::{PathPrefixMatcher, PathRewrite};

/// A compiled route table entry.
#[derive(Debug, Clone)]
pub struct Route {
    pub name: Arc<str>,
    matcher: PathPrefixMatcher,
    rewrite: PathRewrite,
    scheme: UriScheme,
    authority: Authority,
    rewrite_host: bool,
}

impl Route {
    pub fn from_config(config: &RouteConfig) -> Result<Self, ProxyError> {
        let authority = config
            .authority()
            .map_err(|e| ProxyError::InvalidTarget(format!("route '{}': {}", config.name, e)))?;
        let scheme = match config.scheme {
            Scheme::Http => UriScheme::HTTP,
            Scheme::Https => UriScheme::HTTPS,
        };

        Ok(Self {
            name: Arc::from(config.name.as_str()),
            matcher: PathPrefixMatcher::new(config.prefix.as_str()),
            rewrite: PathRewrite::from_strip(config.strip_prefix.as_deref()),
            scheme,
            authority,
            rewrite_host: config.rewrite_host,
        })
    }

    /// Backend URI for a request. The rewritten path is used byte for byte:
    /// dot segments and percent-escapes reach the backend as received.
    fn target(&self, path: &str, query: Option<&str>) -> Result<Uri, ProxyError> {
        let mut path_and_query = self.rewrite.apply(path).into_owned();
        if let Some(query) = query {
            path_and_query.push('?');
            path_and_query.push_str(query);
        }

        Uri::builder()
            .scheme(self.scheme.clone())
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()
            .map_err(|e| ProxyError::InvalidTarget(format!("route '{}': {}", self.name, e)))
    }
}

/// A route resolved for one request.
#[derive(Debug, Clone)]
pub struct ResolvedRoute {
    /// Name of the matched route.
    pub name: Arc<str>,
    /// Absolute backend URI including the rewritten path and the query.
    pub target: Uri,
    /// Whether the caller's `Host` header must be dropped.
    pub rewrite_host: bool,
}

/// Ordered, immutable route table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Compile routes, preserving declaration order.
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, ProxyError> {
        let routes = configs.iter().map(Route::from_config).collect::<Result<_, _>>()?;
        Ok(Self { routes })
    }

    /// Resolve a path (and optional query) to a backend URI.
    ///
    /// The first route whose prefix is a literal prefix of `path` wins.
    /// `Ok(None)` means no route matched.
    pub fn resolve(&self, path: &str, query: Option<&str>) -> Result<Option<ResolvedRoute>, ProxyError> {
        let Some(route) = self.routes.iter().find(|route| route.matcher.matches(path)) else {
            return Ok(None);
        };

        Ok(Some(ResolvedRoute {
            name: route.name.clone(),
            target: route.target(path, query)?,
            rewrite_host: route.rewrite_host,
        }))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
