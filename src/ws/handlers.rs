//! WebSocket message dispatch

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use std::sync::Arc;

fn error_message(error: GameError) -> ServerMessage {
    let code = match &error {
        GameError::AlreadyRunning(_) => "ALREADY_RUNNING",
        GameError::NoActiveGame(_) => "NO_ACTIVE_GAME",
        GameError::GameAborted => "GAME_ABORTED",
        GameError::InsufficientSubmissions { .. } | GameError::NoVotesCast => "ROUND_FAILED",
    };
    ServerMessage::Error {
        code: code.to_string(),
        msg: error.to_string(),
    }
}

/// Handle a client frame and return an optional direct response.
/// Game feedback itself arrives over the arena channel.
pub async fn handle_message(
    msg: ClientMessage,
    arena: &str,
    name: &str,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::Say { text } => {
            if let Some(limiter) = &state.limiter {
                if !limiter.check(arena, name).await {
                    tracing::warn!(arena, name, "Rate limited");
                    return Some(ServerMessage::Error {
                        code: "RATE_LIMITED".to_string(),
                        msg: "Slow down".to_string(),
                    });
                }
            }
            // Chat without a running game is just chat
            let _ = state.submit_input(arena, name, &text).await;
            None
        }

        ClientMessage::StartGame => {
            tracing::info!(arena, name, "Start game requested");
            state.start_game(arena).await.err().map(error_message)
        }

        ClientMessage::StopGame => {
            tracing::info!(arena, name, "Stop game requested");
            state.stop_game(arena).await.err().map(error_message)
        }

        ClientMessage::Status => Some(ServerMessage::Status {
            game: state.snapshot(arena).await,
        }),
    }
}
