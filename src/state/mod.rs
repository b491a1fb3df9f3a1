pub mod acronym;
pub mod announce;
pub mod countdown;
pub mod face_off;
pub mod game;
pub mod round;
pub mod score;
pub mod tally;

pub use game::{Game, GameOptions};

use crate::broadcast::BroadcastMessenger;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::throttle::RateLimiter;
use crate::types::*;
use round::RoundEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state: one running game per arena
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<RwLock<HashMap<ArenaId, Arc<Game>>>>,
    /// Broadcast channel per arena, created on first use
    pub channels: Arc<RwLock<HashMap<ArenaId, broadcast::Sender<ServerMessage>>>>,
    pub config: GameConfig,
    /// Chat throttle for the transport (None = unthrottled)
    pub limiter: Option<RateLimiter>,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            channels: Arc::new(RwLock::new(HashMap::new())),
            config,
            limiter: None,
        }
    }

    pub fn with_limiter(mut self, limiter: Option<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Sender for an arena's channel
    pub async fn channel(&self, arena: &str) -> broadcast::Sender<ServerMessage> {
        if let Some(tx) = self.channels.read().await.get(arena) {
            return tx.clone();
        }
        self.channels
            .write()
            .await
            .entry(arena.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }

    pub async fn subscribe(&self, arena: &str) -> broadcast::Receiver<ServerMessage> {
        self.channel(arena).await.subscribe()
    }

    /// Forget an arena's channel once nobody listens and no game is registered.
    /// Returns true if the channel was dropped.
    pub async fn release_channel(&self, arena: &str) -> bool {
        let games = self.games.read().await;
        if games.contains_key(arena) {
            return false;
        }
        let mut channels = self.channels.write().await;
        if channels
            .get(arena)
            .is_some_and(|tx| tx.receiver_count() == 0)
        {
            channels.remove(arena);
            tracing::debug!(arena, "Released idle arena channel");
            return true;
        }
        false
    }

    pub async fn start_game(&self, arena: &str) -> GameResult<Arc<Game>> {
        self.start_game_with(
            arena,
            GameOptions {
                config: self.config.clone(),
                seed: None,
            },
        )
        .await
    }

    /// Start a game and run it in the background. It leaves the table when
    /// its run loop ends, however that happens.
    pub async fn start_game_with(&self, arena: &str, options: GameOptions) -> GameResult<Arc<Game>> {
        let (game, tx) = {
            let mut games = self.games.write().await;
            if games.get(arena).is_some_and(|game| game.is_live()) {
                return Err(GameError::AlreadyRunning(arena.to_string()));
            }
            // Taken under the games lock so a release cannot orphan it
            let tx = self.channel(arena).await;
            let game = Game::new(
                arena.to_string(),
                options,
                Arc::new(BroadcastMessenger::new(tx.clone())),
            );
            games.insert(arena.to_string(), game.clone());
            (game, tx)
        };

        // Ignore send errors (no receivers connected is fine)
        let _ = tx.send(ServerMessage::GameStarted {
            game_id: game.id().to_string(),
        });

        let state = self.clone();
        let runner = game.clone();
        tokio::spawn(async move {
            let game_id = runner.id().to_string();
            let arena = runner.arena().to_string();
            let _ = runner.run().await;

            {
                let mut games = state.games.write().await;
                if games.get(&arena).is_some_and(|game| game.id() == game_id) {
                    games.remove(&arena);
                }
            }
            state.release_channel(&arena).await;
        });

        tracing::info!(arena, game_id = %game.id(), "Game registered");
        Ok(game)
    }

    /// Stop the arena's game. Stopping an arena with no live game is an error,
    /// stopping twice never has an effect.
    pub async fn stop_game(&self, arena: &str) -> GameResult<()> {
        let game = self
            .games
            .write()
            .await
            .remove(arena)
            .ok_or_else(|| GameError::NoActiveGame(arena.to_string()))?;

        if game.stop() {
            let tx = self.channel(arena).await;
            let _ = tx.send(ServerMessage::GameStopped);
        }
        self.release_channel(arena).await;
        Ok(())
    }

    pub async fn get_game(&self, arena: &str) -> Option<Arc<Game>> {
        self.games.read().await.get(arena).cloned()
    }

    pub async fn submit_input(
        &self,
        arena: &str,
        participant: &str,
        text: &str,
    ) -> GameResult<Option<RoundEvent>> {
        let game = self
            .get_game(arena)
            .await
            .ok_or_else(|| GameError::NoActiveGame(arena.to_string()))?;
        Ok(game.submit_input(participant, text).await)
    }

    pub async fn snapshot(&self, arena: &str) -> Option<GameSnapshot> {
        let game = self.get_game(arena).await?;
        Some(game.snapshot().await)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
