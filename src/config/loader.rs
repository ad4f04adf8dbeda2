//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, DEFAULT_AI_HOST};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
    /// Malformed static header document.
    Headers(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Headers(msg) => write!(f, "Header document error: {}", msg),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a TOML document into a configuration (no validation).
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    toml::from_str(content).map_err(ConfigError::Parse)
}

/// Load a configuration, apply environment overrides, then validate.
///
/// Without a path the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            parse_config(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply `PORT`, `NODE_ENV`/`APP_ENV` and `AI_HOST` overrides.
///
/// `lookup` abstracts the environment so overrides can be tested without
/// mutating process state.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.listener.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid PORT override"),
        }
    }

    let production = ["NODE_ENV", "APP_ENV"]
        .iter()
        .filter_map(|key| lookup(key))
        .any(|value| value.eq_ignore_ascii_case("production"));
    if production {
        config.production = true;
    }

    if let Some(host) = lookup("AI_HOST").filter(|h| !h.trim().is_empty()) {
        for route in config.routes.iter_mut().filter(|r| r.host == DEFAULT_AI_HOST) {
            route.host = host.clone();
        }
    }
}
