//! Relaying a backend response to the waiting caller.
//!
//! The caller holds the receiving end of a oneshot channel. The response head
//! is sent through it exactly once, after the backend's headers have arrived;
//! body chunks follow through a bounded channel that backs the caller's
//! response body. After the head is sent the status can no longer change, so
//! a later failure can only abort the body stream.

use axum::body::{Body, Bytes};
use axum::http::response::Parts;
use axum::http::Response;
use futures_util::{stream, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::error::ProxyError;
use crate::proxy::forwarder::{Dispatch, OutboundRequest};

/// What the caller eventually receives for a job.
pub type JobResult = Result<Response<Body>, ProxyError>;

/// Chunks buffered between the backend and a slow caller.
const RELAY_BUFFER: usize = 16;

type ChunkSender = mpsc::Sender<Result<Bytes, ProxyError>>;

/// Per-call relay state.
#[derive(Debug)]
pub struct ResponseRelay {
    respond_to: Option<oneshot::Sender<JobResult>>,
    body_tx: Option<ChunkSender>,
    client_gone: bool,
}

impl ResponseRelay {
    pub fn new(respond_to: oneshot::Sender<JobResult>) -> Self {
        Self {
            respond_to: Some(respond_to),
            body_tx: None,
            client_gone: false,
        }
    }

    /// True once the response head has been handed to the caller.
    pub fn headers_flushed(&self) -> bool {
        self.respond_to.is_none()
    }

    /// True if the caller stopped listening.
    pub fn client_gone(&self) -> bool {
        self.client_gone
    }

    /// Hand the response head to the caller. Body chunks follow through
    /// [`send_chunk`](Self::send_chunk).
    pub fn flush_headers(&mut self, parts: Parts) {
        let Some(respond_to) = self.respond_to.take() else {
            return;
        };

        let (tx, rx) = mpsc::channel(RELAY_BUFFER);
        let chunks = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) });
        let response = Response::from_parts(parts, Body::from_stream(chunks));

        if respond_to.send(Ok(response)).is_err() {
            self.client_gone = true;
        } else {
            self.body_tx = Some(tx);
        }
    }

    /// Forward one body chunk. If the caller is gone the chunk is discarded.
    pub async fn send_chunk(&mut self, chunk: Bytes) {
        if let Some(tx) = &self.body_tx {
            if tx.send(Ok(chunk)).await.is_err() {
                tracing::debug!("Caller went away mid-response, draining backend body");
                self.body_tx = None;
                self.client_gone = true;
            }
        }
    }

    /// End the body stream cleanly.
    pub fn finish(&mut self) {
        self.body_tx = None;
    }

    /// Report a failure. Before the head is flushed the caller gets the
    /// error (500); afterwards the body stream is aborted.
    pub fn fail(&mut self, err: ProxyError) {
        if let Some(respond_to) = self.respond_to.take() {
            let _ = respond_to.send(Err(err));
            return;
        }

        if let Some(tx) = self.body_tx.take() {
            // The stream must end in an error, not a clean EOF, or a
            // truncated body would look complete.
            tokio::spawn(async move {
                let _ = tx.send(Err(err)).await;
            });
        }
    }
}

/// Run one backend call through `relay`: dispatch, flush the head, then
/// stream every body chunk. Returns once the backend body is exhausted.
pub async fn relay_backend(
    dispatcher: &dyn Dispatch,
    request: OutboundRequest,
    relay: &mut ResponseRelay,
) -> Result<(), ProxyError> {
    let response = dispatcher.dispatch(request).await?;
    let (parts, body) = response.into_parts();
    relay.flush_headers(parts);

    let mut chunks = body.into_data_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.map_err(|e| ProxyError::BackendStream(e.to_string()))?;
        relay.send_chunk(chunk).await;
    }

    relay.finish();
    Ok(())
}
