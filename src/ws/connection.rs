//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching subscription commands and forwarding filtered events.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::domain::{MemberId, NetworkEvent};

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads subscription commands from the client and applies them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(socket: WebSocket, mut event_rx: broadcast::Receiver<NetworkEvent>) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs);
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(network_event) => {
                        if subs.matches(network_event.member_id()) {
                            let msg = WsMessage {
                                id: uuid::Uuid::new_v4().to_string(),
                                msg_type: WsMessageType::Event,
                                timestamp: chrono::Utc::now(),
                                payload: serde_json::to_value(&network_event).unwrap_or_default(),
                            };
                            let json = serde_json::to_string(&msg).unwrap_or_default();
                            if ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
fn handle_text_message(text: &str, subs: &mut SubscriptionManager) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        let err = WsMessage {
            id: String::new(),
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 400,
                "message": "malformed JSON"
            }),
        };
        return serde_json::to_string(&err).ok();
    };

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload.clone()) else {
        let err = WsMessage {
            id: msg.id,
            msg_type: WsMessageType::Error,
            timestamp: chrono::Utc::now(),
            payload: serde_json::json!({
                "code": 404,
                "message": "unknown command"
            }),
        };
        return serde_json::to_string(&err).ok();
    };

    match command {
        WsCommand::Subscribe { member_ids } => {
            let (ids, wildcard) = parse_member_ids(&member_ids);
            subs.subscribe(&ids, wildcard);
            let response = WsMessage {
                id: msg.id,
                msg_type: WsMessageType::Response,
                timestamp: chrono::Utc::now(),
                payload: serde_json::json!({
                    "subscribed": ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            };
            serde_json::to_string(&response).ok()
        }
        WsCommand::Unsubscribe { member_ids } => {
            let (ids, _) = parse_member_ids(&member_ids);
            subs.unsubscribe(&ids);
            let response = WsMessage {
                id: msg.id,
                msg_type: WsMessageType::Response,
                timestamp: chrono::Utc::now(),
                payload: serde_json::json!({
                    "unsubscribed": ids.iter().map(|id| id.to_string()).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                }),
            };
            serde_json::to_string(&response).ok()
        }
    }
}

/// Parses string member IDs, treating `"*"` as the wildcard.
fn parse_member_ids(raw: &[String]) -> (Vec<MemberId>, bool) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    for s in raw {
        if s == "*" {
            wildcard = true;
        } else if let Ok(uuid) = s.parse::<uuid::Uuid>() {
            ids.push(MemberId::from_uuid(uuid));
        }
    }
    (ids, wildcard)
}
