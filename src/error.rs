use crate::types::ArenaId;

pub type GameResult<T> = Result<T, GameError>;

/// Failures reported by game orchestration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("Not enough submissions ({submitted}), need at least 2")]
    InsufficientSubmissions { submitted: usize },

    #[error("Nobody voted")]
    NoVotesCast,

    #[error("Game aborted")]
    GameAborted,

    #[error("A game is already running in {0}")]
    AlreadyRunning(ArenaId),

    #[error("No game running in {0}")]
    NoActiveGame(ArenaId),
}

impl GameError {
    /// A round that produced no result but lets the game continue
    pub fn is_failed_round(&self) -> bool {
        matches!(
            self,
            GameError::InsufficientSubmissions { .. } | GameError::NoVotesCast
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_round_classification() {
        assert!(GameError::NoVotesCast.is_failed_round());
        assert!(GameError::InsufficientSubmissions { submitted: 1 }.is_failed_round());
        assert!(!GameError::GameAborted.is_failed_round());
        assert!(!GameError::AlreadyRunning("main".to_string()).is_failed_round());
    }

    #[test]
    fn test_error_display() {
        let error = GameError::InsufficientSubmissions { submitted: 1 };
        assert_eq!(error.to_string(), "Not enough submissions (1), need at least 2");
    }
}
