//! WebSocket relay to the multiplayer backend.
//!
//! # Responsibilities
//! - Complete the upgrade handshake with the client
//! - Open a WebSocket connection to the multiplayer backend (same path and
//!   query as the client's request)
//! - Forward frames in both directions until either side closes
//!
//! # Design Decisions
//! - Upgrades bypass the admission queue; they are long-lived sessions
//! - Frame-level forwarding, no message buffering
//! - Close frames propagated in both directions

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        FromRequestParts, Request,
    },
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::{
    self,
    protocol::{frame::coding::CloseCode, CloseFrame as BackendCloseFrame},
    Message as BackendMessage,
};
use url::Url;

use crate::http::request::path_and_query;

/// Relays WebSocket sessions to a single backend.
#[derive(Debug, Clone)]
pub struct MultiplayerRelay {
    base: Url,
}

impl MultiplayerRelay {
    /// `base` must be a `ws://` or `wss://` URL.
    pub fn new(base: &str) -> Result<Self, String> {
        let base = Url::parse(base).map_err(|e| format!("invalid multiplayer url '{}': {}", base, e))?;
        match base.scheme() {
            "ws" | "wss" => Ok(Self { base }),
            other => Err(format!("multiplayer url must use ws or wss, got '{}'", other)),
        }
    }

    /// Backend URL for a client request path (+ query).
    pub fn target(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path_and_query)
    }

    /// Accept the client's upgrade and relay the session.
    pub async fn upgrade(&self, request: Request) -> Response {
        let target = self.target(path_and_query(request.uri()));
        let (mut parts, _body) = request.into_parts();

        let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(upgrade) => upgrade,
            Err(rejection) => return rejection.into_response(),
        };

        tracing::info!(target = %target, "Relaying WebSocket session");
        upgrade.on_upgrade(move |socket| async move {
            if let Err(e) = relay(socket, &target).await {
                tracing::warn!(target = %target, error = %e, "WebSocket relay ended with error");
            }
        })
    }
}

async fn relay(mut client: WebSocket, target: &str) -> Result<(), tungstenite::Error> {
    let backend = match tokio_tungstenite::connect_async(target).await {
        Ok((backend, _)) => backend,
        Err(e) => {
            let _ = client
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::ERROR,
                    reason: "backend unavailable".into(),
                })))
                .await;
            return Err(e);
        }
    };

    let (mut backend_tx, mut backend_rx) = backend.split();
    let (mut client_tx, mut client_rx) = client.split();

    let client_to_backend = async {
        while let Some(Ok(message)) = client_rx.next().await {
            let closing = matches!(message, Message::Close(_));
            if backend_tx.send(to_backend(message)).await.is_err() || closing {
                break;
            }
        }
    };

    let backend_to_client = async {
        while let Some(Ok(message)) = backend_rx.next().await {
            let Some(message) = to_client(message) else {
                continue;
            };
            let closing = matches!(message, Message::Close(_));
            if client_tx.send(message).await.is_err() || closing {
                break;
            }
        }
    };

    tokio::select! {
        _ = client_to_backend => {}
        _ = backend_to_client => {}
    }

    Ok(())
}

fn to_backend(message: Message) -> BackendMessage {
    match message {
        Message::Text(text) => BackendMessage::Text(text.as_str().into()),
        Message::Binary(data) => BackendMessage::Binary(data),
        Message::Ping(data) => BackendMessage::Ping(data),
        Message::Pong(data) => BackendMessage::Pong(data),
        Message::Close(frame) => BackendMessage::Close(frame.map(|frame| BackendCloseFrame {
            code: CloseCode::from(frame.code),
            reason: frame.reason.as_str().into(),
        })),
    }
}

/// Raw frames have no client-side equivalent and are dropped.
fn to_client(message: BackendMessage) -> Option<Message> {
    let message = match message {
        BackendMessage::Text(text) => Message::Text(text.as_str().into()),
        BackendMessage::Binary(data) => Message::Binary(data),
        BackendMessage::Ping(data) => Message::Ping(data),
        BackendMessage::Pong(data) => Message::Pong(data),
        BackendMessage::Close(frame) => Message::Close(frame.map(|frame| CloseFrame {
            code: u16::from(frame.code),
            reason: frame.reason.as_str().into(),
        })),
        BackendMessage::Frame(_) => return None,
    };
    Some(message)
}
