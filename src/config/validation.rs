//! Configuration validation.
//!
//! Serde handles the syntactic checks; this module covers the semantic ones.
//! All errors are collected rather than stopping at the first.

use std::collections::HashSet;
use std::fmt;

use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A route prefix that does not begin with `/`.
    InvalidPrefix { route: String, prefix: String },
    /// The strip prefix would not apply to every path the route matches.
    StripNotPrefix { route: String, strip: String },
    /// A route that can never match because an earlier route covers it.
    ShadowedRoute { route: String, by: String },
    DuplicateRouteName(String),
    EmptyHost(String),
    /// Host that does not form a valid `host:port` authority.
    InvalidHost { route: String, host: String },
    ZeroPort(String),
    ZeroTimeout,
    EmptyRouteTable,
    /// Multiplayer relay URL that does not parse as `ws://` or `wss://`.
    InvalidMultiplayerUrl(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidPrefix { route, prefix } => {
                write!(f, "route '{}': prefix '{}' must start with '/'", route, prefix)
            }
            ValidationError::StripNotPrefix { route, strip } => {
                write!(f, "route '{}': strip_prefix '{}' is not a prefix of the match prefix", route, strip)
            }
            ValidationError::ShadowedRoute { route, by } => {
                write!(f, "route '{}' is unreachable behind earlier route '{}'", route, by)
            }
            ValidationError::DuplicateRouteName(name) => write!(f, "duplicate route name '{}'", name),
            ValidationError::EmptyHost(name) => write!(f, "route '{}': host is empty", name),
            ValidationError::InvalidHost { route, host } => {
                write!(f, "route '{}': host '{}' is not a valid URI authority", route, host)
            }
            ValidationError::ZeroPort(name) => write!(f, "route '{}': port must be non-zero", name),
            ValidationError::ZeroTimeout => write!(f, "queue.job_timeout_secs must be greater than zero"),
            ValidationError::EmptyRouteTable => write!(f, "route table is empty"),
            ValidationError::InvalidMultiplayerUrl(url) => {
                write!(f, "multiplayer.url '{}' must be a ws:// or wss:// URL", url)
            }
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.queue.job_timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if config.routes.is_empty() {
        errors.push(ValidationError::EmptyRouteTable);
    }

    if let Some(url) = &config.multiplayer.url {
        let valid = Url::parse(url)
            .map(|parsed| matches!(parsed.scheme(), "ws" | "wss"))
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidMultiplayerUrl(url.clone()));
        }
    }

    let mut names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRouteName(route.name.clone()));
        }

        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidPrefix {
                route: route.name.clone(),
                prefix: route.prefix.clone(),
            });
        }

        if let Some(strip) = &route.strip_prefix {
            if !route.prefix.starts_with(strip.as_str()) {
                errors.push(ValidationError::StripNotPrefix {
                    route: route.name.clone(),
                    strip: strip.clone(),
                });
            }
        }

        if route.host.trim().is_empty() {
            errors.push(ValidationError::EmptyHost(route.name.clone()));
        } else if route.authority().is_err() {
            errors.push(ValidationError::InvalidHost {
                route: route.name.clone(),
                host: route.host.clone(),
            });
        }
        if route.port == 0 {
            errors.push(ValidationError::ZeroPort(route.name.clone()));
        }

        // First match wins, so a broader prefix declared earlier hides this one.
        if let Some(earlier) = config.routes[..index]
            .iter()
            .find(|earlier| route.prefix.starts_with(earlier.prefix.as_str()))
        {
            errors.push(ValidationError::ShadowedRoute {
                route: route.name.clone(),
                by: earlier.name.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, Scheme};

    fn route(name: &str, prefix: &str, strip: Option<&str>) -> RouteConfig {
        RouteConfig {
            name: name.into(),
            prefix: prefix.into(),
            strip_prefix: strip.map(Into::into),
            host: "127.0.0.1".into(),
            port: 9000,
            scheme: Scheme::Http,
            rewrite_host: false,
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&GatewayConfig::default()).is_ok());
    }

    #[test]
    fn broader_prefix_first_shadows_narrower() {
        let config = GatewayConfig {
            routes: vec![route("ai", "/api/ai/", None), route("tts", "/api/ai/tts", Some("/api"))],
            ..GatewayConfig::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::ShadowedRoute { route: "tts".into(), by: "ai".into() }]
        );
    }

    #[test]
    fn collects_every_error() {
        let mut bad = route("ocr", "api/ocr", Some("/v1"));
        bad.port = 0;
        let config = GatewayConfig {
            routes: vec![bad, route("ocr", "/x", None)],
            ..GatewayConfig::default()
        };

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::ZeroPort("ocr".into())));
        assert!(errors.contains(&ValidationError::DuplicateRouteName("ocr".into())));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPrefix { .. })));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::StripNotPrefix { .. })));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.queue.job_timeout_secs = 0;
        assert_eq!(validate_config(&config).unwrap_err(), vec![ValidationError::ZeroTimeout]);
    }

    #[test]
    fn multiplayer_url_must_be_websocket() {
        let mut config = GatewayConfig::default();
        config.multiplayer.url = Some("http://127.0.0.1:2222".into());
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidMultiplayerUrl("http://127.0.0.1:2222".into())]
        );

        config.multiplayer.url = Some("ws://127.0.0.1:2222".into());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn malformed_host_fails_validation() {
        let mut bad = route("ocr", "/api/ocr", Some("/api"));
        bad.host = "ai host".into();
        let config = GatewayConfig {
            routes: vec![bad],
            ..GatewayConfig::default()
        };

        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidHost { route: "ocr".into(), host: "ai host".into() }]
        );
    }
}
