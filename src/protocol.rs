use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Raw chat line: a phrase, a ballot number, or just talk
    Say {
        text: String,
    },
    StartGame,
    StopGame,
    Status,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        arena: ArenaId,
        name: ParticipantId,
        server_now: String,
        game: Option<GameSnapshot>,
    },
    Public {
        text: String,
    },
    /// Only delivered to the connection named `to`
    Private {
        to: ParticipantId,
        text: String,
    },
    Status {
        game: Option<GameSnapshot>,
    },
    GameStarted {
        game_id: GameId,
    },
    GameStopped,
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    /// Whether a connection for `participant` should receive this message
    pub fn is_for(&self, participant: &str) -> bool {
        match self {
            ServerMessage::Private { to, .. } => to == participant,
            _ => true,
        }
    }
}
