//! WebSocket relay. One `broadcast` channel per conversation room; a socket
//! joins rooms it is a participant of and receives `message` and `typing`
//! events for them. Delivery is best effort: a lagging socket skips events.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use dashmap::DashMap;
use domains::{Actor, Message};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::extract::ApiQuery;
use crate::state::AppState;

const ROOM_CAPACITY: usize = 64;
/// Per-socket outbound queue; events past this are dropped for that socket.
const OUTBOUND_CAPACITY: usize = 64;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join { conversation_id: Uuid },
    Leave { conversation_id: Uuid },
    Typing { conversation_id: Uuid },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Message { conversation_id: Uuid, message: Message },
    Typing { conversation_id: Uuid, user_id: Uuid },
    Error { message: String },
}

#[derive(Clone, Default)]
pub struct RealtimeHub {
    rooms: Arc<DashMap<Uuid, broadcast::Sender<ServerEvent>>>,
}

impl RealtimeHub {
    pub fn subscribe(&self, room: Uuid) -> broadcast::Receiver<ServerEvent> {
        self.rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .subscribe()
    }

    /// Sends to everyone in the room. Returns how many sockets received it.
    pub fn publish(&self, room: Uuid, event: ServerEvent) -> usize {
        let delivered = match self.rooms.get(&room) {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.prune(room);
        }
        delivered
    }

    pub fn prune(&self, room: Uuid) {
        self.rooms.remove_if(&room, |_, tx| tx.receiver_count() == 0);
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: String,
}

/// `GET /ws?token=…`. The token is checked before the upgrade, so a missing
/// or bad one gets an enveloped 400 or 401 instead of a socket.
pub async fn upgrade(
    State(state): State<AppState>,
    ApiQuery(WsQuery { token }): ApiQuery<WsQuery>,
    ws: WebSocketUpgrade,
) -> ApiResult<Response> {
    let actor = state.services.auth.authenticate(&token).await?;
    Ok(ws.on_upgrade(move |socket| serve_socket(state, actor, socket)))
}

async fn serve_socket(state: AppState, actor: Actor, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_CAPACITY);
    tracing::debug!(user_id = %actor.id, "realtime socket opened");

    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(error = %e, "dropping unserializable realtime event");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let mut joined: HashMap<Uuid, JoinHandle<()>> = HashMap::new();
    while let Some(Ok(frame)) = ws_rx.next().await {
        let text = match frame {
            WsMessage::Text(text) => text,
            WsMessage::Close(_) => break,
            _ => continue,
        };
        let event = match serde_json::from_str::<ClientEvent>(text.as_str()) {
            Ok(event) => event,
            Err(e) => {
                offer(&out_tx, ServerEvent::Error { message: format!("bad event: {e}") });
                continue;
            }
        };
        match event {
            ClientEvent::Join { conversation_id } => {
                if joined.contains_key(&conversation_id) {
                    continue;
                }
                match state.services.messages.conversation(&actor, conversation_id).await {
                    Ok(_) => {
                        let rx = state.hub.subscribe(conversation_id);
                        joined.insert(conversation_id, forward(rx, actor.id, out_tx.clone()));
                    }
                    Err(e) => {
                        offer(&out_tx, ServerEvent::Error { message: e.to_string() });
                    }
                }
            }
            ClientEvent::Leave { conversation_id } => {
                if let Some(task) = joined.remove(&conversation_id) {
                    task.abort();
                    state.hub.prune(conversation_id);
                }
            }
            ClientEvent::Typing { conversation_id } => {
                if joined.contains_key(&conversation_id) {
                    state.hub.publish(conversation_id, ServerEvent::Typing { conversation_id, user_id: actor.id });
                } else {
                    offer(&out_tx, ServerEvent::Error { message: "join the conversation first".into() });
                }
            }
        }
    }

    for (room, task) in joined {
        task.abort();
        state.hub.prune(room);
    }
    writer.abort();
    tracing::debug!(user_id = %actor.id, "realtime socket closed");
}

/// Queues an event for one socket without waiting. A full queue drops the
/// event; returns `false` once the socket's writer is gone.
fn offer(out: &mpsc::Sender<ServerEvent>, event: ServerEvent) -> bool {
    match out.try_send(event) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!("realtime socket queue full, dropping event");
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/// Pipes a room into one socket's outbound queue, minus the socket's own
/// typing events.
fn forward(
    mut rx: broadcast::Receiver<ServerEvent>,
    user_id: Uuid,
    out: mpsc::Sender<ServerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ServerEvent::Typing { user_id: typist, .. }) if typist == user_id => continue,
                Ok(event) => {
                    if !offer(&out, event) {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "realtime subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
