//! Network layer subsystem.
//!
//! Plain TCP listening is handled by `axum::serve`; this module only adds the
//! optional TLS listener configuration.

pub mod tls;
