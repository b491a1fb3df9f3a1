use crate::protocol::ServerMessage;
use tokio::sync::broadcast;

/// Outbound chat delivery. Fire-and-forget: implementations never block and
/// never report failure back into the game.
pub trait Messenger: Send + Sync {
    fn send_public(&self, text: &str);
    fn send_private(&self, participant: &str, text: &str);
}

/// Delivers messages to every connection subscribed to an arena channel.
/// Private messages travel on the same channel and are filtered by recipient
/// on the connection side.
#[derive(Clone)]
pub struct BroadcastMessenger {
    tx: broadcast::Sender<ServerMessage>,
}

impl BroadcastMessenger {
    pub fn new(tx: broadcast::Sender<ServerMessage>) -> Self {
        Self { tx }
    }
}

impl Messenger for BroadcastMessenger {
    fn send_public(&self, text: &str) {
        // Ignore send errors (no receivers connected is fine)
        let _ = self.tx.send(ServerMessage::Public {
            text: text.to_string(),
        });
    }

    fn send_private(&self, participant: &str, text: &str) {
        let _ = self.tx.send(ServerMessage::Private {
            to: participant.to_string(),
            text: text.to_string(),
        });
    }
}
