//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → controller.rs (OPTIONS, upgrades, route lookup, admission)
//!     → [queue runs the job, proxy relays the backend response]
//!     → response.rs (static headers)
//!     → Send to client
//! ```

pub mod controller;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use server::{AppState, GatewayServer};
pub use websocket::MultiplayerRelay;
