//! Single-slot admission queue.
//!
//! Jobs run strictly one at a time in enqueue order. Each job gets a fixed
//! execution budget measured from the moment it starts. A job whose caller
//! disappears while it is still pending is skipped without contacting the
//! backend; once a job has started, the caller leaving has no effect on it.
//!
//! The pending queue is unbounded: excess load waits rather than being
//! rejected.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::Response;
use tokio::sync::{broadcast, oneshot, Notify};
use tokio::time;

use crate::error::ProxyError;
use crate::observability::metrics;
use crate::proxy::relay::{relay_backend, ResponseRelay};
use crate::proxy::{Dispatch, JobResult, OutboundRequest};
use crate::queue::job::{ForwardJob, JobId, JobOutcome};

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<ForwardJob>,
    active: Option<JobId>,
    /// Ids of pending jobs whose caller went away. Consulted and cleared
    /// right before the job would start.
    cancelled: HashSet<JobId>,
    closed: bool,
}

#[derive(Debug)]
struct QueueShared {
    state: Mutex<QueueState>,
    notify: Notify,
    job_timeout: Duration,
}

impl QueueShared {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // Critical sections never panic; recover the guard if one ever did.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle to the admission queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AdmissionQueue {
    shared: Arc<QueueShared>,
}

impl AdmissionQueue {
    /// Create a queue and spawn its worker. The worker stops when
    /// `shutdown` fires; jobs still pending then fail with a queue error.
    pub fn start(
        job_timeout: Duration,
        dispatcher: Arc<dyn Dispatch>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let queue = Self {
            shared: Arc::new(QueueShared {
                state: Mutex::new(QueueState::default()),
                notify: Notify::new(),
                job_timeout,
            }),
        };

        tokio::spawn(queue.clone().run_worker(dispatcher, shutdown));
        queue
    }

    /// Enqueue a request. The returned ticket yields the response; dropping
    /// it before the job starts cancels the job.
    pub fn enqueue(&self, route: Arc<str>, request: OutboundRequest) -> Result<JobTicket, ProxyError> {
        let (respond_to, response) = oneshot::channel();
        let id = JobId::new();

        let depth = {
            let mut state = self.shared.lock();
            if state.closed {
                return Err(ProxyError::QueueInternal("admission queue is closed".into()));
            }
            state.pending.push_back(ForwardJob {
                id,
                route: route.clone(),
                request,
                respond_to,
                enqueued_at: Instant::now(),
            });
            state.pending.len()
        };

        metrics::set_queue_depth(depth);
        tracing::debug!(job_id = %id, route = %route, queue_depth = depth, "Job queued");
        self.shared.notify.notify_one();

        Ok(JobTicket {
            id,
            response,
            queue: self.clone(),
            settled: false,
        })
    }

    /// Mark a pending job as cancelled. Returns false when the job already
    /// started or is unknown, in which case nothing changes.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut state = self.shared.lock();
        if state.pending.iter().any(|job| job.id == id) {
            state.cancelled.insert(id);
            true
        } else {
            false
        }
    }

    /// Number of jobs waiting for their turn (cancelled ones included until
    /// the worker reaches them).
    pub fn pending_len(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// The job currently running, if any.
    pub fn active(&self) -> Option<JobId> {
        self.shared.lock().active
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }

    async fn run_worker(self, dispatcher: Arc<dyn Dispatch>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(job_timeout = ?self.shared.job_timeout, "Admission queue worker started");

        loop {
            let job = tokio::select! {
                biased;
                _ = shutdown.recv() => break,
                job = self.next_job() => job,
            };

            self.execute(dispatcher.clone(), job).await;
            self.shared.lock().active = None;
        }

        self.close();
        tracing::info!("Admission queue worker stopped");
    }

    /// Wait for the next job that has not been cancelled and mark it active.
    async fn next_job(&self) -> ForwardJob {
        loop {
            if let Some(job) = self.take_next() {
                return job;
            }
            self.shared.notify.notified().await;
        }
    }

    fn take_next(&self) -> Option<ForwardJob> {
        let mut state = self.shared.lock();
        let next = loop {
            let job = state.pending.pop_front()?;
            if state.cancelled.remove(&job.id) {
                tracing::debug!(job_id = %job.id, route = %job.route, "Caller gone before start, skipping job");
                metrics::record_job(JobOutcome::Skipped, Duration::ZERO);
                continue;
            }
            state.active = Some(job.id);
            break job;
        };
        metrics::set_queue_depth(state.pending.len());
        Some(next)
    }

    async fn execute(&self, dispatcher: Arc<dyn Dispatch>, job: ForwardJob) {
        let ForwardJob {
            id,
            route,
            request,
            respond_to,
            enqueued_at,
        } = job;

        metrics::record_queue_wait(enqueued_at.elapsed());
        tracing::debug!(job_id = %id, route = %route, target = %request.target, "Job started");

        let budget = self.shared.job_timeout;
        let started = Instant::now();
        let log_route = route.clone();

        // Run in a separate task so a panicking job cannot take the worker down.
        let handle = tokio::spawn(async move {
            let mut relay = ResponseRelay::new(respond_to);
            match time::timeout(budget, relay_backend(dispatcher.as_ref(), request, &mut relay)).await {
                Ok(Ok(())) => JobOutcome::Completed,
                Ok(Err(err)) => {
                    tracing::error!(
                        job_id = %id,
                        route = %route,
                        error = %err,
                        error_type = err.error_type(),
                        headers_flushed = relay.headers_flushed(),
                        "Backend request failed"
                    );
                    relay.fail(err);
                    JobOutcome::BackendError
                }
                Err(_) => {
                    tracing::error!(
                        job_id = %id,
                        route = %route,
                        budget = ?budget,
                        headers_flushed = relay.headers_flushed(),
                        "Job exceeded its execution budget"
                    );
                    relay.fail(ProxyError::BackendTimeout(budget));
                    JobOutcome::TimedOut
                }
            }
        });

        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(job_id = %id, route = %log_route, error = %e, "Job task aborted");
                JobOutcome::BackendError
            }
        };

        let elapsed = started.elapsed();
        metrics::record_job(outcome, elapsed);
        tracing::debug!(job_id = %id, outcome = outcome.as_str(), elapsed = ?elapsed, "Job finished");
    }

    /// Refuse new jobs and fail everything still pending.
    fn close(&self) {
        let abandoned = {
            let mut state = self.shared.lock();
            state.closed = true;
            state.active = None;
            state.cancelled.clear();
            std::mem::take(&mut state.pending)
        };

        if !abandoned.is_empty() {
            tracing::warn!(count = abandoned.len(), "Failing jobs still pending at shutdown");
        }
        for job in abandoned {
            let _ = job
                .respond_to
                .send(Err(ProxyError::QueueInternal("gateway shutting down".into())));
        }
        metrics::set_queue_depth(0);
    }
}

/// A caller's handle to a queued job.
///
/// Dropping the ticket before the job starts (the caller's connection went
/// away and its handler was dropped) cancels the job.
#[derive(Debug)]
pub struct JobTicket {
    id: JobId,
    response: oneshot::Receiver<JobResult>,
    queue: AdmissionQueue,
    settled: bool,
}

impl JobTicket {
    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job's response head.
    pub async fn response(mut self) -> Result<Response<Body>, ProxyError> {
        let result = (&mut self.response).await;
        self.settled = true;
        result.unwrap_or_else(|_| Err(ProxyError::QueueInternal("job ended without a response".into())))
    }
}

impl Drop for JobTicket {
    fn drop(&mut self) {
        if !self.settled && self.queue.cancel(self.id) {
            tracing::debug!(job_id = %self.id, "Caller disconnected, job cancelled");
        }
    }
}
