//! Backend forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardJob (from the admission queue)
//!     → forwarder.rs (build outbound request, send, await response head)
//!     → relay.rs (hand head to caller once, stream body chunks)
//!     → caller's response body
//! ```
//!
//! # Design Decisions
//! - Single flush point: the caller sees a status only after the backend's
//!   headers arrived
//! - Streaming responses avoid buffering the entire body
//! - Failures are surfaced as 500, never retried

pub mod forwarder;
pub mod relay;

pub use forwarder::{Dispatch, Forwarder, OutboundRequest};
pub use relay::{JobResult, ResponseRelay};
