//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file yields a working gateway with
//! the built-in route table.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::http::uri::{Authority, InvalidUri};
use serde::{Deserialize, Serialize};

/// Host serving every inference backend except IRN.
pub const DEFAULT_AI_HOST: &str = "ai-host.webaverse.com";

/// Host serving the IRN backend over TLS.
pub const IRN_HOST: &str = "local.webaverse.com";

/// Default backend ports, one per inference service.
pub mod ports {
    pub const MIDAS_DEPTH: u16 = 7860;
    pub const ZOE_DEPTH: u16 = 7861;
    pub const IMAGINAIRY: u16 = 7862;
    pub const FALCON: u16 = 7863;
    pub const FASTCHAT: u16 = 7864;
    pub const TTS: u16 = 7865;
    pub const DEPTH: u16 = 7866;
    pub const MASK2FORMER: u16 = 7867;
    pub const DOCTR: u16 = 7868;
    pub const BLIP2: u16 = 7869;
    pub const SEGMENTATION: u16 = 7870;
    pub const IRN: u16 = 7871;
    pub const AI_SERVER: u16 = 7872;
}

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, port, TLS).
    pub listener: ListenerConfig,

    /// Admission queue settings.
    pub queue: QueueConfig,

    /// Static response header document.
    pub headers: HeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// WebSocket relay target for upgrade requests.
    pub multiplayer: MultiplayerConfig,

    /// Production mode. Only affects log formatting.
    pub production: bool,

    /// Ordered route table. First matching prefix wins.
    pub routes: Vec<RouteConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            queue: QueueConfig::default(),
            headers: HeadersConfig::default(),
            observability: ObservabilityConfig::default(),
            multiplayer: MultiplayerConfig::default(),
            production: false,
            routes: default_routes(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_address: IpAddr,

    /// Port to listen on.
    pub port: u16,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 80,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Admission queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Execution budget per job in seconds, measured from job start.
    pub job_timeout_secs: u64,

    /// Largest request body buffered before a job is enqueued.
    pub max_body_bytes: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            job_timeout_secs: 15,
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Static response header document location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HeadersConfig {
    /// Path to a JSON document of the form
    /// `{"headers": [{"source": "...", "headers": [{"key": .., "value": ..}]}]}`.
    pub path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Multiplayer WebSocket relay configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MultiplayerConfig {
    /// Base WebSocket URL (e.g., "ws://127.0.0.1:2222"). Upgrades are passed
    /// through untouched when unset.
    pub url: Option<String>,
}

/// Backend URL scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the ordered route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging/metrics.
    pub name: String,

    /// Literal path prefix to match.
    pub prefix: String,

    /// Literal prefix removed from the path before forwarding.
    #[serde(default)]
    pub strip_prefix: Option<String>,

    /// Backend host.
    pub host: String,

    /// Backend port.
    pub port: u16,

    #[serde(default = "default_scheme")]
    pub scheme: Scheme,

    /// Drop the caller's `Host` header so the backend sees its own.
    #[serde(default)]
    pub rewrite_host: bool,
}

fn default_scheme() -> Scheme {
    Scheme::Http
}

impl RouteConfig {
    /// Backend `host:port`, checked for URI syntax.
    pub fn authority(&self) -> Result<Authority, InvalidUri> {
        format!("{}:{}", self.host, self.port).parse()
    }

    fn ai(name: &str, prefix: &str, strip_prefix: Option<&str>, port: u16) -> Self {
        Self {
            name: name.to_string(),
            prefix: prefix.to_string(),
            strip_prefix: strip_prefix.map(str::to_string),
            host: DEFAULT_AI_HOST.to_string(),
            port,
            scheme: Scheme::Http,
            rewrite_host: false,
        }
    }
}

/// Built-in route table. Order matters: `/api/ai/tts` must precede `/api/ai/`.
pub fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::ai("midas-depth", "/midasDepth", None, ports::MIDAS_DEPTH),
        RouteConfig::ai("zoe-depth", "/zoeDepth", None, ports::ZOE_DEPTH),
        RouteConfig::ai("imaginairy", "/api/imaginairy/", Some("/api/imaginairy"), ports::IMAGINAIRY),
        RouteConfig::ai("falcon", "/api/falcon/", Some("/api/falcon"), ports::FALCON),
        RouteConfig::ai("pygmalion", "/api/pygmalion/", Some("/api/pygmalion"), ports::FASTCHAT),
        RouteConfig::ai("tts", "/api/ai/tts", Some("/api"), ports::TTS),
        RouteConfig::ai("depth", "/api/depth/", Some("/api/depth"), ports::DEPTH),
        RouteConfig::ai("mask2former", "/api/mask2former/", Some("/api/mask2former"), ports::MASK2FORMER),
        RouteConfig::ai("ocr", "/api/ocr", Some("/api"), ports::DOCTR),
        RouteConfig::ai("caption", "/api/caption", Some("/api"), ports::BLIP2),
        RouteConfig::ai("vqa", "/api/vqa", Some("/api"), ports::BLIP2),
        RouteConfig::ai(
            "image-segmentation",
            "/api/imageSegmentation/",
            Some("/api/imageSegmentation"),
            ports::SEGMENTATION,
        ),
        RouteConfig {
            name: "irn".to_string(),
            prefix: "/api/irn/".to_string(),
            strip_prefix: Some("/api/irn".to_string()),
            host: IRN_HOST.to_string(),
            port: ports::IRN,
            scheme: Scheme::Https,
            rewrite_host: false,
        },
        RouteConfig::ai("ai-server", "/api/ai/", None, ports::AI_SERVER),
    ]
}
