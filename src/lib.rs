//! Reverse-proxy gateway for AI inference backends.
//!
//! Requests are matched against an ordered prefix route table, admitted to a
//! single-slot queue, and forwarded one at a time to the selected backend.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod queue;
pub mod routing;

pub use config::{GatewayConfig, StaticHeaders};
pub use error::ProxyError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
