//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Front controller
//!     → admission.rs enqueue (pending, FIFO) → JobTicket to the caller
//!     → worker: skip if cancelled, else mark active
//!     → proxy::relay (dispatch + stream, under the job budget)
//!     → release the slot, next job
//!
//! Caller disconnects:
//!     JobTicket dropped → id recorded as cancelled if still pending
//! ```
//!
//! # Design Decisions
//! - Exactly one job in flight; only the worker occupies or frees the slot
//! - Budget measured from job start, not from enqueue
//! - Cancellation only suppresses jobs that have not started
//! - No maximum queue depth

pub mod admission;
pub mod job;

pub use admission::{AdmissionQueue, JobTicket};
pub use job::{ForwardJob, JobId, JobOutcome};
