pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;

pub const DEFAULT_ARENA: &str = "main";

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub arena: Option<String>,
    pub name: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        arena = ?params.arena,
        name = ?params.name,
        "WebSocket connection request"
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

/// Participant names are trimmed; anonymous connections get a generated one
fn participant_name(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("guest-{}", ulid::Ulid::new()))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let arena = params
        .arena
        .as_deref()
        .map(str::trim)
        .filter(|arena| !arena.is_empty())
        .unwrap_or(DEFAULT_ARENA)
        .to_string();
    let name = participant_name(params.name.as_deref());

    tracing::info!(arena = %arena, name = %name, "WebSocket connected");

    // Subscribe before the welcome so nothing falls in between
    let mut arena_rx = state.subscribe(&arena).await;

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        arena: arena.clone(),
        name: name.clone(),
        server_now: chrono::Utc::now().to_rfc3339(),
        game: state.snapshot(&arena).await,
    };

    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            drop(arena_rx);
            state.release_channel(&arena).await;
            return;
        }
    }

    loop {
        tokio::select! {
            // Arena broadcasts, private lines only to their recipient
            arena_msg = arena_rx.recv() => {
                match arena_msg {
                    Ok(msg) if msg.is_for(&name) => {
                        if let Ok(json) = serde_json::to_string(&msg) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(arena = %arena, name = %name, skipped, "Connection lagging behind arena");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(arena = %arena, name = %name, "Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &arena, &name, &state).await
                                {
                                    if let Ok(json) = serde_json::to_string(&response) {
                                        if sender.send(Message::Text(json.into())).await.is_err() {
                                            tracing::error!("Failed to send response");
                                            break;
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                if let Ok(json) = serde_json::to_string(&error) {
                                    let _ = sender.send(Message::Text(json.into())).await;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    drop(arena_rx);
    state.release_channel(&arena).await;

    tracing::info!(arena = %arena, name = %name, "WebSocket connection closed");
}
