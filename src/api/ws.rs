//! Real-time channel upgrade (spec §6, §4.2). One task per accepted
//! connection, reading `Inbound` frames and dispatching them to the `Hub`;
//! the `WsTransport` adapter is the only thing standing between the Hub's
//! transport-agnostic `Transport` trait and axum's websocket type.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::Error;
use crate::hub::{Inbound, Outbound, SessionId, Transport};
use crate::principal::Principal;

use super::AppState;

struct WsTransport {
    sink: AsyncMutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&self, message: Outbound) -> Result<(), Error> {
        let text = serde_json::to_string(&message).map_err(|err| Error::Internal(err.into()))?;
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text))
            .await
            .map_err(|err| Error::Internal(err.into()))
    }
}

pub async fn upgrade(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, principal))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, principal: Principal) {
    let (sink, mut stream) = socket.split();
    let transport = Arc::new(WsTransport {
        sink: AsyncMutex::new(sink),
    });

    let mut session_id: Option<SessionId> = None;

    while let Some(Ok(message)) = stream.next().await {
        let text = match message {
            Message::Text(text) => text,
            Message::Close(_) => break,
            _ => continue,
        };

        let inbound: Inbound = match serde_json::from_str(&text) {
            Ok(inbound) => inbound,
            Err(err) => {
                let _ = transport
                    .send(Outbound::Error {
                        message: format!("malformed message: {err}"),
                    })
                    .await;
                continue;
            }
        };

        if let Err(err) = dispatch(&state, &transport, &mut session_id, principal, inbound).await {
            // `Hub::join` already emits `Outbound::AccessDenied` itself on
            // deny (spec §4.2); sending a second, generic error for the
            // same failure would double up the client-visible message.
            if !matches!(err, Error::Forbidden(_)) {
                let _ = transport
                    .send(Outbound::Error {
                        message: err.to_string(),
                    })
                    .await;
            }
        }
    }

    if let Some(session_id) = session_id {
        state.hub.leave(session_id).await;
    }
}

async fn dispatch(
    state: &Arc<AppState>,
    transport: &Arc<WsTransport>,
    session_id: &mut Option<SessionId>,
    principal: Principal,
    inbound: Inbound,
) -> Result<(), Error> {
    match inbound {
        Inbound::JoinDocument { document_id, .. } => {
            let id = state
                .hub
                .join(transport.clone() as Arc<dyn Transport>, document_id, principal)
                .await?;
            *session_id = Some(id);
        }
        Inbound::LeaveDocument { .. } => {
            if let Some(id) = session_id.take() {
                state.hub.leave(id).await;
            }
        }
        Inbound::CursorUpdate {
            position,
            selection,
            username,
            ..
        } => {
            let id = session_id
                .ok_or_else(|| Error::BadRequest("not joined to a document yet".into()))?;
            state.hub.update_cursor(id, position, selection, username).await?;
        }
        Inbound::TypingStart { .. } => {
            let id = session_id
                .ok_or_else(|| Error::BadRequest("not joined to a document yet".into()))?;
            state.hub.set_typing(id, true).await?;
        }
        Inbound::TypingStop { .. } => {
            let id = session_id
                .ok_or_else(|| Error::BadRequest("not joined to a document yet".into()))?;
            state.hub.set_typing(id, false).await?;
        }
        Inbound::DocumentChange { change, .. } => {
            let id = session_id
                .ok_or_else(|| Error::BadRequest("not joined to a document yet".into()))?;
            state.hub.broadcast_content(id, change.new_content).await?;
        }
    }
    Ok(())
}
