//! Static response header document.
//!
//! The document uses the hosting-platform layout the frontend already ships
//! with:
//!
//! ```json
//! { "headers": [ { "source": "/(.*)", "headers": [ { "key": "...", "value": "..." } ] } ] }
//! ```
//!
//! Only the first block is applied, to every response.

use std::fs;
use std::path::Path;

use axum::http::{HeaderName, HeaderValue};
use serde::Deserialize;

use crate::config::loader::ConfigError;

#[derive(Debug, Deserialize)]
struct HeaderDocument {
    #[serde(default)]
    headers: Vec<HeaderBlock>,
}

#[derive(Debug, Deserialize)]
struct HeaderBlock {
    #[serde(default)]
    headers: Vec<HeaderEntry>,
}

#[derive(Debug, Deserialize)]
struct HeaderEntry {
    key: String,
    value: String,
}

/// Fixed response headers applied to every response.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl StaticHeaders {
    pub fn new(entries: Vec<(HeaderName, HeaderValue)>) -> Self {
        Self { entries }
    }

    /// Parse the JSON header document.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let document: HeaderDocument =
            serde_json::from_str(content).map_err(|e| ConfigError::Headers(e.to_string()))?;

        let Some(block) = document.headers.into_iter().next() else {
            return Ok(Self::default());
        };

        let mut entries = Vec::with_capacity(block.headers.len());
        for HeaderEntry { key, value } in block.headers {
            let name = HeaderName::try_from(key.as_str())
                .map_err(|e| ConfigError::Headers(format!("invalid header name '{}': {}", key, e)))?;
            let value = HeaderValue::try_from(value.as_str())
                .map_err(|e| ConfigError::Headers(format!("invalid value for '{}': {}", key, e)))?;
            entries.push((name, value));
        }

        Ok(Self { entries })
    }

    /// Load the document from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json(&content)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
