//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → listener stops accepting, drains connections
//!             → queue worker finishes the active job, fails pending ones
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
