//! Game and server configuration loaded from `ACRO_*` environment variables

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Letter pool weighted roughly by how often words start with each letter
pub const DEFAULT_CHAR_POOL: &str =
    "AAAAAABBBBBCCCCCDDDDEEEFFFFGGGGHHHHIIIJJKKLLLLMMMMMNNNOOOPPPPPQRRRRSSSSSSSTTTTTUUVVWWWWXYYZ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub char_pool: String,
    pub min_letters: usize,
    pub max_letters: usize,
    pub face_off_min_letters: usize,
    pub face_off_rounds: usize,
    pub point_cap: u32,
    pub points_vote_for_winner: u32,
    pub points_fastest_with_vote: u32,
    pub secs_per_acro_round: u64,
    pub secs_per_vote_round: u64,
    pub secs_per_face_off_round: u64,
    pub secs_between_face_off_rounds: u64,
    pub secs_between_messages: u64,
    pub secs_after_results: u64,
    pub secs_between_rounds: u64,
    /// Consecutive rounds without a result before the game gives up
    pub max_failed_rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            char_pool: DEFAULT_CHAR_POOL.to_string(),
            min_letters: 3,
            max_letters: 6,
            face_off_min_letters: 3,
            face_off_rounds: 3,
            point_cap: 30,
            points_vote_for_winner: 1,
            points_fastest_with_vote: 2,
            secs_per_acro_round: 60,
            secs_per_vote_round: 30,
            secs_per_face_off_round: 40,
            secs_between_face_off_rounds: 10,
            secs_between_messages: 1,
            secs_after_results: 5,
            secs_between_rounds: 10,
            max_failed_rounds: 3,
        }
    }
}

/// Read an env var, treating empty or unparsable values as unset
fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = trimmed, "Ignoring unparsable config value");
            None
        }
    }
}

impl GameConfig {
    /// Load configuration from environment variables, defaulting anything unset
    pub fn from_env() -> Self {
        let d = Self::default();
        let config = Self {
            char_pool: env_parse("ACRO_CHAR_POOL").unwrap_or(d.char_pool),
            min_letters: env_parse("ACRO_MIN_LETTERS").unwrap_or(d.min_letters),
            max_letters: env_parse("ACRO_MAX_LETTERS").unwrap_or(d.max_letters),
            face_off_min_letters: env_parse("ACRO_FACE_OFF_MIN_LETTERS")
                .unwrap_or(d.face_off_min_letters),
            face_off_rounds: env_parse("ACRO_FACE_OFF_ROUNDS").unwrap_or(d.face_off_rounds),
            point_cap: env_parse("ACRO_POINT_CAP").unwrap_or(d.point_cap),
            points_vote_for_winner: env_parse("ACRO_POINTS_VOTE_FOR_WINNER")
                .unwrap_or(d.points_vote_for_winner),
            points_fastest_with_vote: env_parse("ACRO_POINTS_FASTEST_WITH_VOTE")
                .unwrap_or(d.points_fastest_with_vote),
            secs_per_acro_round: env_parse("ACRO_SECS_PER_ACRO_ROUND")
                .unwrap_or(d.secs_per_acro_round),
            secs_per_vote_round: env_parse("ACRO_SECS_PER_VOTE_ROUND")
                .unwrap_or(d.secs_per_vote_round),
            secs_per_face_off_round: env_parse("ACRO_SECS_PER_FACE_OFF_ROUND")
                .unwrap_or(d.secs_per_face_off_round),
            secs_between_face_off_rounds: env_parse("ACRO_SECS_BETWEEN_FACE_OFF_ROUNDS")
                .unwrap_or(d.secs_between_face_off_rounds),
            secs_between_messages: env_parse("ACRO_SECS_BETWEEN_MESSAGES")
                .unwrap_or(d.secs_between_messages),
            secs_after_results: env_parse("ACRO_SECS_AFTER_RESULTS")
                .unwrap_or(d.secs_after_results),
            secs_between_rounds: env_parse("ACRO_SECS_BETWEEN_ROUNDS")
                .unwrap_or(d.secs_between_rounds),
            max_failed_rounds: env_parse("ACRO_MAX_FAILED_ROUNDS")
                .unwrap_or(d.max_failed_rounds),
        }
        .normalized();

        tracing::info!(
            min_letters = config.min_letters,
            max_letters = config.max_letters,
            point_cap = config.point_cap,
            face_off_rounds = config.face_off_rounds,
            "Game config loaded"
        );
        config
    }

    /// Repair values the engine cannot work with
    pub fn normalized(mut self) -> Self {
        if self.min_letters > self.max_letters {
            std::mem::swap(&mut self.min_letters, &mut self.max_letters);
        }
        if !self.char_pool.chars().any(|c| c.is_ascii_alphabetic()) {
            self.char_pool = DEFAULT_CHAR_POOL.to_string();
        }
        self
    }
}

/// Process-level settings for the transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Max `say` frames per participant per window (None = unthrottled)
    pub rate_limit: Option<(u32, Duration)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // 2276 spells "ACRO" on a phone keypad
            bind: SocketAddr::from(([0, 0, 0, 0], 2276)),
            rate_limit: Some((20, Duration::from_secs(10))),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let d = Self::default();

        let rate_limit_enabled = std::env::var("ACRO_RATE_LIMIT")
            .map(|v| v != "0" && v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit = if rate_limit_enabled {
            let (default_max, default_window) = d.rate_limit.unwrap_or((20, Duration::from_secs(10)));
            Some((
                env_parse("ACRO_RATE_LIMIT_MAX").unwrap_or(default_max),
                env_parse("ACRO_RATE_LIMIT_WINDOW")
                    .map(Duration::from_secs)
                    .unwrap_or(default_window),
            ))
        } else {
            None
        };

        Self {
            bind: env_parse("ACRO_BIND").unwrap_or(d.bind),
            rate_limit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_config() {
        let config = GameConfig::default();
        assert_eq!(config.min_letters, 3);
        assert_eq!(config.max_letters, 6);
        assert_eq!(config.char_pool, DEFAULT_CHAR_POOL);
    }

    #[test]
    fn test_normalized_swaps_letter_bounds() {
        let config = GameConfig {
            min_letters: 7,
            max_letters: 4,
            char_pool: "123".to_string(),
            ..GameConfig::default()
        }
        .normalized();

        assert_eq!(config.min_letters, 4);
        assert_eq!(config.max_letters, 7);
        assert_eq!(config.char_pool, DEFAULT_CHAR_POOL);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides_and_ignores_garbage() {
        std::env::set_var("ACRO_POINT_CAP", "12");
        std::env::set_var("ACRO_MIN_LETTERS", "not-a-number");
        std::env::set_var("ACRO_SECS_PER_VOTE_ROUND", "  ");

        let config = GameConfig::from_env();

        std::env::remove_var("ACRO_POINT_CAP");
        std::env::remove_var("ACRO_MIN_LETTERS");
        std::env::remove_var("ACRO_SECS_PER_VOTE_ROUND");

        assert_eq!(config.point_cap, 12);
        assert_eq!(config.min_letters, 3);
        assert_eq!(config.secs_per_vote_round, 30);
    }

    #[test]
    #[serial]
    fn test_server_config_rate_limit_can_be_disabled() {
        std::env::set_var("ACRO_RATE_LIMIT", "false");
        let config = ServerConfig::from_env();
        std::env::remove_var("ACRO_RATE_LIMIT");

        assert!(config.rate_limit.is_none());
        assert_eq!(config.bind.port(), 2276);
    }
}
