//! Forward jobs and their lifecycle states.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::proxy::{JobResult, OutboundRequest};

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// One proxied request, owned by the admission queue from enqueue until it
/// finishes or is skipped.
#[derive(Debug)]
pub struct ForwardJob {
    pub id: JobId,
    /// Name of the matched route, for logs and metrics.
    pub route: Arc<str>,
    pub request: OutboundRequest,
    pub(crate) respond_to: oneshot::Sender<JobResult>,
    pub(crate) enqueued_at: Instant,
}

/// Terminal state of a job.
///
/// ```text
/// Pending → Skipped
/// Pending → Running → Completed | TimedOut | BackendError
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Caller left before the job started; no backend contact.
    Skipped,
    Completed,
    TimedOut,
    BackendError,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobOutcome::Skipped => "skipped",
            JobOutcome::Completed => "completed",
            JobOutcome::TimedOut => "timed_out",
            JobOutcome::BackendError => "backend_error",
        }
    }
}
